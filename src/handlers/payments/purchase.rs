use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Json;
use crate::middleware::CallerContext;
use crate::models::{CreatePaymentRecord, validate_email_format};
use crate::payments::{GatewayInit, InitializeRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_id: String,
    pub course_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub email: String,
}

impl PurchaseRequest {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation(msg::MISSING_USER_ID.into()));
        }
        if self.course_id.trim().is_empty() {
            return Err(AppError::Validation(msg::MISSING_COURSE_ID.into()));
        }
        if self.amount <= 0 {
            return Err(AppError::Validation(msg::INVALID_AMOUNT.into()));
        }
        validate_email_format(&self.email)
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub data: GatewayInit,
}

/// Open a checkout for `course_id` and record the attempt as `pending`.
///
/// The gateway is called before anything is written, so a gateway failure
/// leaves no ledger entry behind. The caller must not already own the course.
pub async fn initiate(state: &AppState, request: &PurchaseRequest) -> Result<GatewayInit> {
    request.validate()?;

    let email = request.email.trim().to_lowercase();

    let full_name = {
        let conn = state.db.get()?;

        let user = queries::get_user_by_id(&conn, &request.user_id)?
            .or_not_found(msg::USER_NOT_FOUND)?;
        let course = queries::get_course_by_id(&conn, &request.course_id)?
            .or_not_found(msg::COURSE_NOT_FOUND)?;

        if queries::user_owns_course(&conn, &user.id, &course.id)? {
            return Err(AppError::AlreadyOwned(msg::ALREADY_OWNED.into()));
        }

        if user.email != email {
            tracing::warn!(
                user_id = %user.id,
                "Purchase email differs from account email, confirmation will resolve by payer email"
            );
        }

        user.name
    };

    let init = state
        .gateway
        .initialize(&InitializeRequest {
            email: email.clone(),
            amount: request.amount,
            callback_url: state.callback_url.clone(),
        })
        .await
        .map_err(|e| match e {
            AppError::Gateway(_) => e,
            other => AppError::Gateway(other.to_string()),
        })?;

    let conn = state.db.get()?;
    let record = queries::create_payment_record(
        &conn,
        &CreatePaymentRecord {
            reference: init.reference.clone(),
            user_id: request.user_id.clone(),
            course_id: request.course_id.clone(),
            amount: request.amount,
            email,
            full_name,
        },
    )
    .inspect_err(|e| {
        if matches!(e, AppError::Conflict(_)) {
            tracing::error!(
                provider = state.gateway.provider_name(),
                reference = %init.reference,
                "Gateway issued a reference that is already in the ledger"
            );
        }
    })?;

    tracing::info!(
        reference = %record.reference,
        user_id = %record.user_id,
        course_id = %record.course_id,
        amount = record.amount,
        "Purchase initiated"
    );

    Ok(init)
}

pub async fn initiate_purchase(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    tracing::debug!(caller = %caller.user.id, user_id = %request.user_id, "Purchase requested");

    let data = initiate(&state, &request).await?;
    Ok(Json(PurchaseResponse {
        success: true,
        data,
    }))
}
