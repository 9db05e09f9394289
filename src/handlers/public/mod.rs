use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{OptionExt, Result, msg};
use crate::extractors::{Json, Query};
use crate::models::PaymentStatus;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Query string Paystack appends when redirecting the buyer back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    pub reference: String,
    pub status: PaymentStatus,
}

/// Landing endpoint after checkout. Reports the ledger status only; access is
/// granted by the webhook, never by this redirect.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>> {
    let reference = query
        .reference
        .or(query.trxref)
        .or_not_found(msg::PAYMENT_NOT_FOUND)?;

    let conn = state.db.get()?;
    let record = queries::get_payment_by_reference(&conn, &reference)?
        .or_not_found(msg::PAYMENT_NOT_FOUND)?;

    Ok(Json(CallbackResponse {
        success: true,
        reference: record.reference,
        status: record.status,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payments/callback", get(payment_callback))
}
