use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Lifecycle of a purchase attempt. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// One purchase attempt, keyed by the gateway-issued reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub reference: String,
    pub user_id: String,
    pub course_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub email: String,
    pub full_name: String,
    pub status: PaymentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug)]
pub struct CreatePaymentRecord {
    pub reference: String,
    pub user_id: String,
    pub course_id: String,
    pub amount: i64,
    pub email: String,
    pub full_name: String,
}

/// Successful payments for a single course plus their summed amount.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBuyers {
    pub count: usize,
    pub total_amount: i64,
    pub data: Vec<PaymentRecord>,
}

/// Ledger-wide rollup over successful payments.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub total_users: i64,
    pub total_amount: i64,
    pub total_courses: i64,
}
