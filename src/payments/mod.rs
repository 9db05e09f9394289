mod paystack;

pub use paystack::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the buyer is asked to pay, and where the gateway sends them afterwards.
#[derive(Debug, Clone)]
pub struct InitializeRequest {
    pub email: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub callback_url: String,
}

/// Result of opening a checkout with the gateway. `reference` keys the ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInit {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

/// Outbound payment gateway. Every failure (network, 4xx, 5xx, bad body) is
/// reported as `AppError::Gateway`; there is no internal retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn initialize(&self, request: &InitializeRequest) -> Result<GatewayInit>;
}
