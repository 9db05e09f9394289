use axum::{Extension, Router, extract::State, middleware, routing::get};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::id::is_valid_prefixed_id;
use crate::middleware::{CallerContext, caller_auth};
use crate::models::Course;

#[derive(Debug, Serialize)]
pub struct OwnedCoursesResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Course>,
}

/// Courses a user owns. Callers may read their own; admins may read anyone's.
pub async fn list_owned_courses(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(user_id): Path<String>,
) -> Result<Json<OwnedCoursesResponse>> {
    caller.require_self_or_privileged(&user_id)?;

    if !is_valid_prefixed_id(&user_id) {
        return Err(AppError::NotFound(msg::USER_NOT_FOUND.into()));
    }

    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &user_id)?.or_not_found(msg::USER_NOT_FOUND)?;
    let data = queries::list_user_courses(&conn, &user.id)?;

    Ok(Json(OwnedCoursesResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/courses", get(list_owned_courses))
        .layer(middleware::from_fn_with_state(state, caller_auth))
}
