use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::models::User;
use crate::util::extract_bearer_token;

/// The identified caller, inserted into request extensions by [`caller_auth`].
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user: User,
}

impl CallerContext {
    pub fn is_privileged(&self) -> bool {
        self.user.role.is_privileged()
    }

    pub fn require_privileged(&self) -> Result<()> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::Unauthorized(msg::PRIVILEGED_ONLY.into()))
        }
    }

    /// Callers may act on their own account; admins may act on anyone's.
    pub fn require_self_or_privileged(&self, user_id: &str) -> Result<()> {
        if self.user.id == user_id || self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::Unauthorized(msg::NOT_YOUR_ACCOUNT.into()))
        }
    }
}

/// Resolve the caller from `Authorization: Bearer <api key>`.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

    let conn = state.db.get()?;
    queries::get_user_by_api_key(&conn, token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".into()))
}

pub async fn caller_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user = authenticate(&state, request.headers())?;

    request.extensions_mut().insert(CallerContext { user });
    Ok(next.run(request).await)
}

pub async fn require_privileged(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user = authenticate(&state, request.headers())?;
    let ctx = CallerContext { user };

    if let Err(e) = ctx.require_privileged() {
        tracing::debug!(user_id = %ctx.user.id, role = ctx.user.role.as_ref(), "Rejected non-privileged caller");
        return Err(e);
    }

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
