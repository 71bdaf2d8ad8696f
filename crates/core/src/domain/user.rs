use serde::{Deserialize, Serialize};

/// A registered device. Created on first register/login; `is_vip` is
/// derived from the current purchase record and is eventually consistent
/// with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub internal_id: i64,
    pub device_uuid: String,
    pub original_transaction_id: Option<String>,
    pub is_vip: bool,
    pub vip_expire_ms: Option<i64>,
}

/// Deployment environment an Apple transaction was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }
}

/// Subscription lifecycle state. `expire_date_ms` is non-decreasing for any
/// trajectory whose status stays in `{Active, InRetry}` (invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Active,
    InRetry,
    Expired,
    Revoked,
}

/// `{originalTransactionID (unique), productID, purchaseDateMs, expireDateMs?,
/// status, environment, deviceCount}` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub original_transaction_id: String,
    pub product_id: String,
    pub purchase_date_ms: i64,
    pub expire_date_ms: Option<i64>,
    pub status: PurchaseStatus,
    pub environment: Environment,
    pub device_count: u32,
}

/// `(original_transaction_id, device_uuid)` is the unique key; invariant 3
/// bounds `|{bindings for T}| ≤ 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub original_transaction_id: String,
    pub device_uuid: String,
    pub device_name: Option<String>,
    pub bind_time_ms: i64,
    pub last_active_time_ms: i64,
}

/// Append-only record of a verify-purchase call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogRow {
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub event_type: String,
    pub device_uuid: String,
    pub jws_token: String,
    pub created_at_ms: i64,
}

/// Append-only record of an App Store Server Notification.
/// `notification_uuid` is unique and is the idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLogRow {
    pub notification_uuid: String,
    pub notification_type: String,
    pub subtype: Option<String>,
    pub original_transaction_id: Option<String>,
    pub transaction_id: Option<String>,
    pub environment: Environment,
    pub signed_payload: String,
    pub created_at_ms: i64,
}

/// Append-only analytics/dedup record of a renewal-class notification
/// (spec.md §4.3.3 step 11: SUBSCRIBED/DID_RENEW/DID_RECOVER/
/// INTERACTIVE_RENEWAL with a `transactionID`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEventRow {
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub notification_type: String,
    pub environment: Environment,
    pub created_at_ms: i64,
}
