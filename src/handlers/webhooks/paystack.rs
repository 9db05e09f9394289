use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use crate::db::AppState;
use crate::payments::{
    PAYSTACK_SIGNATURE_HEADER, PaystackEventData, PaystackWebhookEvent, verify_paystack_signature,
};

use super::common::{
    FundsConfirmed, TransferFailed, WebhookEvent, WebhookProvider, WebhookResult, handle_webhook,
};

/// Paystack webhook provider implementation.
pub struct PaystackWebhookProvider;

impl WebhookProvider for PaystackWebhookProvider {
    fn provider_name(&self) -> &'static str {
        "paystack"
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String, WebhookResult> {
        headers
            .get(PAYSTACK_SIGNATURE_HEADER)
            .ok_or((StatusCode::BAD_REQUEST, "Missing x-paystack-signature header"))?
            .to_str()
            .map(|s| s.to_string())
            .map_err(|e| {
                tracing::debug!("Invalid UTF-8 in Paystack signature header: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid signature header")
            })
    }

    fn verify_signature(
        &self,
        secret: &str,
        body: &Bytes,
        signature: &str,
    ) -> Result<bool, WebhookResult> {
        verify_paystack_signature(secret, body, signature).map_err(|e| {
            tracing::error!("Signature verification error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Signature verification failed",
            )
        })
    }

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent, WebhookResult> {
        let event: PaystackWebhookEvent = serde_json::from_slice(body).map_err(|e| {
            tracing::error!("Failed to parse Paystack webhook: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid JSON")
        })?;

        match event.event.as_str() {
            "charge.success" | "transfer.success" => {
                let data = parse_event_data(&event)?;
                Ok(WebhookEvent::FundsConfirmed(FundsConfirmed {
                    reference: data.reference,
                    payer_email: data.customer.email,
                }))
            }
            "transfer.failed" => {
                let data = parse_event_data(&event)?;
                Ok(WebhookEvent::TransferFailed(TransferFailed {
                    reference: data.reference,
                    payer_email: data.customer.email,
                }))
            }
            _ => Ok(WebhookEvent::Ignored { event: event.event }),
        }
    }
}

fn parse_event_data(event: &PaystackWebhookEvent) -> Result<PaystackEventData, WebhookResult> {
    let data: PaystackEventData = serde_json::from_value(event.data.clone()).map_err(|e| {
        tracing::warn!(event = %event.event, "Malformed Paystack event data: {}", e);
        (StatusCode::BAD_REQUEST, "Missing reference or customer email")
    })?;

    if data.reference.trim().is_empty() || data.customer.email.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing reference or customer email"));
    }
    Ok(data)
}

pub async fn handle_paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_webhook(&PaystackWebhookProvider, &state, headers, body).await
}
