use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};

use super::{GatewayInit, InitializeRequest, PaymentGateway};

type HmacSha512 = Hmac<Sha512>;

pub const PAYSTACK_API_URL: &str = "https://api.paystack.co";

/// Header Paystack puts the hex HMAC-SHA512 of the raw body in.
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Serialize)]
struct InitializeTransactionBody<'a> {
    email: &'a str,
    /// Paystack expects the amount as a string in the lowest denomination
    amount: String,
    callback_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeTransactionData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(secret_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    fn provider_name(&self) -> &'static str {
        "paystack"
    }

    async fn initialize(&self, request: &InitializeRequest) -> Result<GatewayInit> {
        let body = InitializeTransactionBody {
            email: &request.email,
            amount: request.amount.to_string(),
            callback_url: &request.callback_url,
        };

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Paystack API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Paystack API error: {} - {}",
                status, error_text
            )));
        }

        let envelope: PaystackEnvelope<InitializeTransactionData> = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Paystack response: {}", e)))?;

        let data = match envelope {
            PaystackEnvelope {
                status: true,
                data: Some(data),
                ..
            } => data,
            PaystackEnvelope { message, .. } => {
                return Err(AppError::Gateway(format!(
                    "Paystack rejected initialization: {}",
                    message
                )));
            }
        };

        tracing::debug!(reference = %data.reference, "Paystack transaction initialized");

        Ok(GatewayInit {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }
}

/// Verify a Paystack webhook: hex HMAC-SHA512 of the raw body keyed with the secret.
pub fn verify_paystack_signature(secret: &str, payload: &[u8], signature: &str) -> Result<bool> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.trim().to_ascii_lowercase();
    let provided_bytes = provided_bytes.as_bytes();

    // Length is not secret: always 128 hex chars for SHA-512
    if expected_bytes.len() != provided_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(provided_bytes).into())
}

// ============ Webhook payloads ============

/// Raw Paystack webhook body. `data` is interpreted per event name.
#[derive(Debug, Deserialize)]
pub struct PaystackWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The parts of a charge / transfer payload the reconciler relies on.
#[derive(Debug, Deserialize)]
pub struct PaystackEventData {
    pub reference: String,
    pub customer: PaystackCustomer,
}

#[derive(Debug, Deserialize)]
pub struct PaystackCustomer {
    pub email: String,
}
