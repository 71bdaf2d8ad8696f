//! Transaction and renewal-info parsing from a decoded JWS payload
//! (spec.md §4.3.1–§4.3.3).

use bilingo_core::Environment;
use serde_json::Value;

use crate::error::EntitlementError;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub original_transaction_id: String,
    pub transaction_id: Option<String>,
    pub product_id: String,
    pub purchase_date_ms: i64,
    pub expires_date_ms: Option<i64>,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenewalInfo {
    pub original_transaction_id: Option<String>,
    pub auto_renew_status: Option<bool>,
    pub grace_period_expires_date_ms: Option<i64>,
    pub is_in_billing_retry_period: Option<bool>,
}

fn field<'a>(payload: &'a Value, camel: &str, snake: &str) -> Option<&'a Value> {
    payload.get(camel).or_else(|| payload.get(snake)).filter(|v| !v.is_null())
}

fn field_str(payload: &Value, camel: &str, snake: &str) -> Option<String> {
    field(payload, camel, snake).and_then(Value::as_str).map(str::to_string)
}

fn field_i64(payload: &Value, camel: &str, snake: &str) -> Option<i64> {
    field(payload, camel, snake).and_then(Value::as_i64)
}

fn field_bool(payload: &Value, camel: &str, snake: &str) -> Option<bool> {
    field(payload, camel, snake).and_then(Value::as_bool)
}

/// Parses `{originalTransactionID, transactionID?, productID, purchaseDateMs,
/// expiresDateMs?, environment}`, rejecting a payload missing
/// `originalTransactionId` or `productId`.
pub fn parse_transaction(payload: &Value) -> Result<Transaction, EntitlementError> {
    let original_transaction_id =
        field_str(payload, "originalTransactionId", "original_transaction_id")
            .ok_or_else(|| EntitlementError::Validation("missing originalTransactionId".to_string()))?;
    let product_id = field_str(payload, "productId", "product_id")
        .ok_or_else(|| EntitlementError::Validation("missing productId".to_string()))?;
    let transaction_id = field_str(payload, "transactionId", "transaction_id");
    let purchase_date_ms = field_i64(payload, "purchaseDate", "purchase_date").unwrap_or(0);
    let expires_date_ms = field_i64(payload, "expiresDate", "expires_date");
    let environment = match field_str(payload, "environment", "environment").as_deref() {
        Some("Sandbox" | "sandbox") => Environment::Sandbox,
        _ => Environment::Production,
    };

    Ok(Transaction {
        original_transaction_id,
        transaction_id,
        product_id,
        purchase_date_ms,
        expires_date_ms,
        environment,
    })
}

pub fn parse_renewal_info(payload: &Value) -> RenewalInfo {
    RenewalInfo {
        original_transaction_id: field_str(payload, "originalTransactionId", "original_transaction_id"),
        auto_renew_status: field_bool(payload, "autoRenewStatus", "auto_renew_status"),
        grace_period_expires_date_ms: field_i64(
            payload,
            "gracePeriodExpiresDate",
            "grace_period_expires_date",
        ),
        is_in_billing_retry_period: field_bool(
            payload,
            "isInBillingRetryPeriod",
            "is_in_billing_retry_period",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_transaction_rejects_missing_original_transaction_id() {
        let payload = json!({"productId": "monthly"});
        assert!(parse_transaction(&payload).is_err());
    }

    #[test]
    fn parse_transaction_accepts_snake_case_fallback() {
        let payload = json!({
            "original_transaction_id": "otid-1",
            "product_id": "monthly",
            "purchase_date": 1_000,
            "expires_date": 2_000,
        });
        let txn = parse_transaction(&payload).unwrap();
        assert_eq!(txn.original_transaction_id, "otid-1");
        assert_eq!(txn.expires_date_ms, Some(2_000));
        assert_eq!(txn.environment, Environment::Production);
    }
}
