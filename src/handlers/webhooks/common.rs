//! Gateway-agnostic webhook reconciliation.
//!
//! Providers translate their payloads into a [`WebhookEvent`]; everything after
//! that (ledger transitions, entitlement grants, the welcome notification and
//! failed-transfer cleanup) lives here and is shared by every provider.
//!
//! Deliveries are at-least-once and may arrive before the purchase that created
//! the reference has been recorded. Every effect is therefore a conditional
//! single-statement write, and an unknown reference is reported as
//! `NotFoundTransient` so the gateway re-delivers.

use axum::{
    Json,
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::email::WelcomeMessage;
use crate::error::{AppError, Result, msg};
use crate::models::PaymentStatus;

/// Early rejection before an event is translated (bad signature, bad body).
pub type WebhookResult = (StatusCode, &'static str);

/// Money for `reference` was received. Charge and transfer confirmations both map here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsConfirmed {
    pub reference: String,
    /// Customer email from the event; authoritative for resolving the buyer
    pub payer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailed {
    pub reference: String,
    pub payer_email: String,
}

/// Parsed webhook event with provider-agnostic data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    FundsConfirmed(FundsConfirmed),
    TransferFailed(TransferFailed),
    /// Event name the reconciler has no handling for; acknowledged and dropped
    Ignored { event: String },
}

/// Implementors provide provider-specific parsing and signature verification.
pub trait WebhookProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn extract_signature(&self, headers: &HeaderMap) -> std::result::Result<String, WebhookResult>;

    fn verify_signature(
        &self,
        secret: &str,
        body: &Bytes,
        signature: &str,
    ) -> std::result::Result<bool, WebhookResult>;

    fn parse_event(&self, body: &Bytes) -> std::result::Result<WebhookEvent, WebhookResult>;
}

/// What a processed delivery did. Every variant is acknowledged with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `pending -> success` applied by this delivery
    PaymentConfirmed,
    /// The event was already reflected in the ledger
    AlreadyProcessed,
    /// Funds confirmation for a payment that already failed
    PaymentAlreadyFailed,
    /// Transfer failure for a payment that already succeeded
    PaymentAlreadySettled,
    /// `pending -> failed` applied, buyer account kept
    PaymentFailed,
    /// Payment record and buyer account deleted
    AccountPurged,
    /// Payment record deleted, buyer account was already gone
    PaymentRemoved,
    Ignored,
}

impl ReconcileOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ReconcileOutcome::PaymentConfirmed => "Payment confirmed",
            ReconcileOutcome::AlreadyProcessed => "Already processed",
            ReconcileOutcome::PaymentAlreadyFailed => "Payment already failed",
            ReconcileOutcome::PaymentAlreadySettled => "Payment already settled",
            ReconcileOutcome::PaymentFailed => "Payment marked as failed",
            ReconcileOutcome::AccountPurged => "Payment and account removed",
            ReconcileOutcome::PaymentRemoved => "Payment removed",
            ReconcileOutcome::Ignored => "Event ignored",
        }
    }
}

/// Database effects of a funds confirmation, plus the welcome to send if this
/// delivery won the welcome claim.
#[derive(Debug)]
pub struct FundsApplied {
    pub outcome: ReconcileOutcome,
    /// Whether the course was newly added to the buyer's owned set
    pub entitlement_granted: bool,
    pub welcome: Option<WelcomeMessage>,
}

impl FundsApplied {
    fn no_op(outcome: ReconcileOutcome) -> Self {
        Self {
            outcome,
            entitlement_granted: false,
            welcome: None,
        }
    }
}

/// Outcome for a delivery whose `pending -> success` compare-and-set lost.
///
/// `None` means the winner settled it as success and the idempotent grant and
/// welcome claim should still run.
fn lost_transition_outcome(current: Option<PaymentStatus>) -> Option<ReconcileOutcome> {
    match current {
        Some(PaymentStatus::Success) => None,
        Some(PaymentStatus::Failed) => Some(ReconcileOutcome::PaymentAlreadyFailed),
        // Purged by a concurrent transfer failure
        Some(PaymentStatus::Pending) | None => Some(ReconcileOutcome::AlreadyProcessed),
    }
}

/// Apply a funds confirmation to the ledger and entitlement store.
///
/// 1. The record must exist, otherwise `NotFoundTransient` (nothing is fabricated).
/// 2. `pending -> success` by compare-and-set; a failed record is left alone.
/// 3. The buyer is resolved by the event's email, the course by the record.
///    Either missing is `NotFound`, and the status change stays committed.
/// 4. The grant and the welcome claim commit together. Both are idempotent, so
///    replays and deliveries racing on the same buyer converge.
pub fn apply_funds_confirmed(conn: &mut Connection, event: &FundsConfirmed) -> Result<FundsApplied> {
    let record = queries::get_payment_by_reference(conn, &event.reference)?
        .ok_or_else(|| AppError::NotFoundTransient(msg::PAYMENT_NOT_YET_RECORDED.into()))?;

    if record.status == PaymentStatus::Failed {
        tracing::info!(reference = %record.reference, "Funds confirmed for a failed payment, ignoring");
        return Ok(FundsApplied::no_op(ReconcileOutcome::PaymentAlreadyFailed));
    }

    let transitioned =
        queries::try_transition_payment(conn, &record.reference, PaymentStatus::Success)?;

    if !transitioned {
        let current = queries::get_payment_by_reference(conn, &record.reference)?.map(|r| r.status);
        if let Some(outcome) = lost_transition_outcome(current) {
            return Ok(FundsApplied::no_op(outcome));
        }
    }

    let user = queries::get_user_by_email(conn, &event.payer_email)?
        .ok_or_else(|| AppError::NotFound(msg::USER_NOT_FOUND.into()))?;

    if user.id != record.user_id {
        tracing::warn!(
            reference = %record.reference,
            record_user = %record.user_id,
            event_user = %user.id,
            "Payer email resolves to a different user than the payment record"
        );
    }

    let course = queries::get_course_by_id(conn, &record.course_id)?
        .ok_or_else(|| AppError::NotFound(msg::COURSE_NOT_FOUND.into()))?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entitlement_granted = queries::grant_course(&tx, &user.id, &course.id)?;
    let welcome_claimed = queries::try_claim_welcome(&tx, &user.id)?;
    tx.commit()?;

    let welcome = welcome_claimed.then(|| WelcomeMessage {
        to_email: event.payer_email.trim().to_string(),
        full_name: record.full_name.clone(),
    });

    tracing::info!(
        reference = %record.reference,
        user_id = %user.id,
        course_id = %course.id,
        transitioned,
        entitlement_granted,
        welcome_claimed,
        "Funds confirmed"
    );

    Ok(FundsApplied {
        outcome: if transitioned {
            ReconcileOutcome::PaymentConfirmed
        } else {
            ReconcileOutcome::AlreadyProcessed
        },
        entitlement_granted,
        welcome,
    })
}

/// Apply a funds confirmation, then dispatch the welcome if this delivery claimed it.
///
/// A failed dispatch is logged and swallowed; the status and entitlement changes
/// are already committed and are not rolled back.
pub async fn process_funds_confirmed(
    state: &AppState,
    event: &FundsConfirmed,
) -> Result<ReconcileOutcome> {
    let applied = {
        let mut conn = state.db.get()?;
        apply_funds_confirmed(&mut conn, event)?
    };

    if let Some(welcome) = applied.welcome {
        match state.notifier.send_welcome(&welcome).await {
            Ok(result) => tracing::debug!(to = %welcome.to_email, ?result, "Welcome dispatched"),
            Err(e) => tracing::warn!(
                to = %welcome.to_email,
                reference = %event.reference,
                error = %e,
                "Welcome notification failed, entitlement already granted"
            ),
        }
    }

    Ok(applied.outcome)
}

/// Apply a failed transfer.
///
/// With `purge_user` the payment record and the account owning the event's email
/// are deleted together. The account is only deleted when it is the one the
/// payment was recorded for. Without `purge_user` the record moves
/// `pending -> failed` and the account is kept. A payment that already
/// succeeded is never touched.
pub fn apply_transfer_failed(
    conn: &mut Connection,
    event: &TransferFailed,
    purge_user: bool,
) -> Result<ReconcileOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let record = queries::get_payment_by_reference(&tx, &event.reference)?;

    if let Some(record) = &record
        && record.status == PaymentStatus::Success
    {
        tracing::warn!(reference = %record.reference, "Transfer failed for a settled payment, ignoring");
        return Ok(ReconcileOutcome::PaymentAlreadySettled);
    }

    if !purge_user {
        let record = record
            .ok_or_else(|| AppError::NotFoundTransient(msg::PAYMENT_NOT_YET_RECORDED.into()))?;
        let failed = queries::try_transition_payment(&tx, &record.reference, PaymentStatus::Failed)?;
        tx.commit()?;

        if failed {
            tracing::info!(reference = %record.reference, "Payment marked as failed");
            return Ok(ReconcileOutcome::PaymentFailed);
        }
        return Ok(ReconcileOutcome::AlreadyProcessed);
    }

    let user = queries::get_user_by_email(&tx, &event.payer_email)?;

    let outcome = match (record, user) {
        (None, None) => ReconcileOutcome::AlreadyProcessed,
        (None, Some(_)) => {
            return Err(AppError::NotFoundTransient(msg::PAYMENT_NOT_YET_RECORDED.into()));
        }
        (Some(record), Some(user)) if user.id != record.user_id => {
            queries::delete_payment(&tx, &record.reference)?;
            tracing::warn!(
                reference = %record.reference,
                record_user = %record.user_id,
                event_user = %user.id,
                "Transfer failed for another user's payment, removed payment and kept account"
            );
            ReconcileOutcome::PaymentRemoved
        }
        (Some(record), Some(user)) => {
            queries::delete_payment(&tx, &record.reference)?;
            queries::delete_user(&tx, &user.id)?;
            tracing::warn!(
                reference = %record.reference,
                user_id = %user.id,
                "Transfer failed, purged payment and buyer account"
            );
            ReconcileOutcome::AccountPurged
        }
        (Some(record), None) => {
            queries::delete_payment(&tx, &record.reference)?;
            tracing::info!(reference = %record.reference, "Transfer failed, removed payment");
            ReconcileOutcome::PaymentRemoved
        }
    };

    tx.commit()?;
    Ok(outcome)
}

fn process_transfer_failed(state: &AppState, event: &TransferFailed) -> Result<ReconcileOutcome> {
    let mut conn = state.db.get()?;
    apply_transfer_failed(&mut conn, event, state.purge_user_on_transfer_failed)
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

fn reject((status, message): WebhookResult) -> Response {
    let body = WebhookAck {
        success: false,
        message,
        reference: None,
    };
    (status, Json(body)).into_response()
}

/// Verify, translate and reconcile one webhook delivery.
///
/// Every delivery must carry a valid signature; without a signing key nothing
/// is applied. Processed, replayed and ignored events answer 200. Unresolvable references
/// answer 404 (with `retryable` for records that may still be in flight).
pub async fn handle_webhook<P: WebhookProvider>(
    provider: &P,
    state: &AppState,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(secret) = state.webhook_secret.as_deref() else {
        tracing::error!(
            provider = provider.provider_name(),
            "No webhook signing key configured, rejecting delivery"
        );
        return reject((
            StatusCode::SERVICE_UNAVAILABLE,
            "Webhook verification not configured",
        ));
    };

    let signature = match provider.extract_signature(&headers) {
        Ok(s) => s,
        Err(e) => return reject(e),
    };
    match provider.verify_signature(secret, &body, &signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(provider = provider.provider_name(), "Webhook signature mismatch");
            return reject((StatusCode::UNAUTHORIZED, "Invalid signature"));
        }
        Err(e) => return reject(e),
    }

    let event = match provider.parse_event(&body) {
        Ok(e) => e,
        Err(e) => return reject(e),
    };

    let result = match &event {
        WebhookEvent::FundsConfirmed(data) => process_funds_confirmed(state, data)
            .await
            .map(|outcome| (outcome, Some(data.reference.clone()))),
        WebhookEvent::TransferFailed(data) => process_transfer_failed(state, data)
            .map(|outcome| (outcome, Some(data.reference.clone()))),
        WebhookEvent::Ignored { event } => {
            tracing::debug!(provider = provider.provider_name(), event = %event, "Ignoring webhook event");
            Ok((ReconcileOutcome::Ignored, None))
        }
    };

    match result {
        Ok((outcome, reference)) => {
            let body = WebhookAck {
                success: true,
                message: outcome.message(),
                reference,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::warn!(provider = provider.provider_name(), error = %e, "Webhook not applied");
            e.into_response()
        }
    }
}
