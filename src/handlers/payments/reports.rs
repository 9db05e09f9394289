use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::id::is_valid_prefixed_id;
use crate::models::{CourseBuyers, PaymentTotals};

#[derive(Debug, Serialize)]
pub struct CourseBuyersResponse {
    pub success: bool,
    #[serde(flatten)]
    pub buyers: CourseBuyers,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub totals: PaymentTotals,
}

/// Successful payments for one course with their running total. Privileged callers only.
pub async fn get_course_buyers(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseBuyersResponse>> {
    if !is_valid_prefixed_id(&course_id) {
        return Err(AppError::NotFound(msg::COURSE_NOT_FOUND.into()));
    }

    let conn = state.db.get()?;
    queries::get_course_by_id(&conn, &course_id)?.or_not_found(msg::COURSE_NOT_FOUND)?;

    let buyers = queries::get_course_buyers(&conn, &course_id)?;
    Ok(Json(CourseBuyersResponse {
        success: true,
        buyers,
    }))
}

/// Distinct paying users, revenue and course count. Privileged callers only.
pub async fn get_payment_stats(State(state): State<AppState>) -> Result<Json<PaymentStatsResponse>> {
    let conn = state.db.get()?;
    let totals = queries::get_payment_totals(&conn)?;
    Ok(Json(PaymentStatsResponse {
        success: true,
        totals,
    }))
}
