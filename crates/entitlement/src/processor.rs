//! Entitlement Processor (H2): the verify-purchase and App Store Server
//! Notification handlers tying the Receipt Decoder (L1), Entitlement Store
//! (M2), and Device Binder (M3) together (spec.md §4.3.2, §4.3.3).

use std::sync::Arc;

use bilingo_core::{
    CoreError, Environment, NotificationLogRepository, NotificationLogRow, PurchaseEventRepository,
    PurchaseEventRow, PurchaseRecord, PurchaseRecordRepository, PurchaseStatus,
    TransactionLogRepository, TransactionLogRow, UserRepository,
};
use tracing::warn;

use crate::device_binder::DeviceBinder;
use crate::error::EntitlementError;
use crate::jws::{verify_and_decode, TrustAnchors};
use crate::notification::{classify, NotificationClass};
use crate::transaction::{parse_renewal_info, parse_transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPurchaseEvent {
    Purchase,
    Restore,
    Renew,
}

pub struct VerifyPurchaseRequest<'a> {
    pub jws_token: &'a str,
    pub device_uuid: &'a str,
    pub event_type: VerifyPurchaseEvent,
    pub device_name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPurchaseResult {
    pub is_vip: bool,
    pub vip_expire_time_ms: Option<i64>,
    pub bound_devices: Vec<String>,
    pub kicked_device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    pub notification_type: String,
    pub is_vip: Option<bool>,
    pub vip_expire_time_ms: Option<i64>,
    pub duplicate: bool,
}

pub struct EntitlementProcessor {
    purchase_records: Arc<dyn PurchaseRecordRepository>,
    users: Arc<dyn UserRepository>,
    transaction_logs: Arc<dyn TransactionLogRepository>,
    notification_logs: Arc<dyn NotificationLogRepository>,
    purchase_events: Arc<dyn PurchaseEventRepository>,
    device_binder: DeviceBinder,
    trust_anchors: TrustAnchors,
    require_trust: bool,
    expected_bundle_id: String,
    expected_app_apple_id: Option<String>,
}

impl EntitlementProcessor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        purchase_records: Arc<dyn PurchaseRecordRepository>,
        users: Arc<dyn UserRepository>,
        transaction_logs: Arc<dyn TransactionLogRepository>,
        notification_logs: Arc<dyn NotificationLogRepository>,
        purchase_events: Arc<dyn PurchaseEventRepository>,
        device_binder: DeviceBinder,
        trust_anchors: TrustAnchors,
        require_trust: bool,
        expected_bundle_id: String,
        expected_app_apple_id: Option<String>,
    ) -> Self {
        Self {
            purchase_records,
            users,
            transaction_logs,
            notification_logs,
            purchase_events,
            device_binder,
            trust_anchors,
            require_trust,
            expected_bundle_id,
            expected_app_apple_id,
        }
    }

    pub async fn verify_purchase(
        &self,
        request: &VerifyPurchaseRequest<'_>,
        now_ms: i64,
    ) -> Result<VerifyPurchaseResult, EntitlementError> {
        let payload = verify_and_decode(request.jws_token, &self.trust_anchors, self.require_trust)?;
        let txn = parse_transaction(&payload)?;

        let existing = self
            .purchase_records
            .get(&txn.original_transaction_id)
            .await
            .map_err(CoreError::from)?;

        let effective_expire_ms = match (&existing, txn.expires_date_ms) {
            (Some(record), Some(incoming)) => Some(record.expire_date_ms.map_or(incoming, |prev| prev.max(incoming))),
            (Some(record), None) => record.expire_date_ms,
            (None, incoming) => incoming,
        };

        match &existing {
            None => {
                self.purchase_records
                    .insert(&PurchaseRecord {
                        original_transaction_id: txn.original_transaction_id.clone(),
                        product_id: txn.product_id.clone(),
                        purchase_date_ms: txn.purchase_date_ms,
                        expire_date_ms: effective_expire_ms,
                        status: PurchaseStatus::Active,
                        environment: txn.environment,
                        device_count: 0,
                    })
                    .await
                    .map_err(CoreError::from)?;
            }
            Some(record) => {
                let incoming_is_newer = txn.expires_date_ms.is_some_and(|incoming| {
                    record.expire_date_ms.is_none_or(|prev| incoming > prev)
                });
                if incoming_is_newer {
                    let mut updated = record.clone();
                    updated.expire_date_ms = effective_expire_ms;
                    self.purchase_records.update(&updated).await.map_err(CoreError::from)?;
                } else if txn.expires_date_ms.is_some() {
                    warn!(
                        original_transaction_id = %txn.original_transaction_id,
                        "incoming expiresDateMs is not newer than the stored record; keeping existing"
                    );
                }
            }
        }

        let bind_outcome = self
            .device_binder
            .bind(&txn.original_transaction_id, request.device_uuid, request.device_name, now_ms)
            .await?;

        let is_vip = effective_expire_ms.is_none_or(|expire| expire >= now_ms);
        self.users
            .update_vip_status(
                request.device_uuid,
                is_vip,
                effective_expire_ms,
                Some(&txn.original_transaction_id),
            )
            .await
            .map_err(CoreError::from)?;

        let transaction_id = txn.transaction_id.clone().unwrap_or_else(|| txn.original_transaction_id.clone());
        self.transaction_logs
            .append(&TransactionLogRow {
                original_transaction_id: txn.original_transaction_id.clone(),
                transaction_id,
                event_type: event_type_str(request.event_type).to_string(),
                device_uuid: request.device_uuid.to_string(),
                jws_token: request.jws_token.to_string(),
                created_at_ms: now_ms,
            })
            .await
            .map_err(CoreError::from)?;

        Ok(VerifyPurchaseResult {
            is_vip,
            vip_expire_time_ms: effective_expire_ms,
            bound_devices: bind_outcome.bound_devices,
            kicked_device: bind_outcome.kicked_device,
        })
    }

    pub async fn handle_notification(
        &self,
        signed_payload: &str,
        now_ms: i64,
    ) -> Result<NotificationResult, EntitlementError> {
        let envelope = verify_and_decode(signed_payload, &self.trust_anchors, self.require_trust)?;

        let notification_type = envelope
            .get("notificationType")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EntitlementError::Validation("missing notificationType".to_string()))?
            .to_string();
        let subtype = envelope.get("subtype").and_then(serde_json::Value::as_str).map(str::to_string);
        let notification_uuid = envelope
            .get("notificationUUID")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EntitlementError::Validation("missing notificationUUID".to_string()))?
            .to_string();
        let data = envelope.get("data").cloned().unwrap_or(serde_json::Value::Null);

        if self
            .notification_logs
            .exists(&notification_uuid)
            .await
            .map_err(CoreError::from)?
        {
            return Ok(NotificationResult {
                notification_type,
                is_vip: None,
                vip_expire_time_ms: None,
                duplicate: true,
            });
        }

        let class = classify(&notification_type);

        if class == NotificationClass::Test {
            self.log_notification(&notification_uuid, &notification_type, subtype.as_deref(), None, None, Environment::Production, signed_payload, now_ms)
                .await?;
            return Ok(NotificationResult { notification_type, is_vip: None, vip_expire_time_ms: None, duplicate: false });
        }

        let bundle_id = data.get("bundleId").and_then(serde_json::Value::as_str);
        if bundle_id != Some(self.expected_bundle_id.as_str()) {
            return Err(EntitlementError::Validation("bundleId mismatch".to_string()));
        }
        if let Some(expected_app_id) = &self.expected_app_apple_id {
            let app_apple_id = data.get("appAppleId").and_then(serde_json::Value::as_i64).map(|v| v.to_string());
            if app_apple_id.as_deref() != Some(expected_app_id.as_str()) {
                return Err(EntitlementError::Validation("appAppleId mismatch".to_string()));
            }
        }
        let environment = match data.get("environment").and_then(serde_json::Value::as_str) {
            Some("Sandbox" | "sandbox") => Environment::Sandbox,
            _ => Environment::Production,
        };

        let signed_transaction_info = data.get("signedTransactionInfo").and_then(serde_json::Value::as_str);
        let signed_renewal_info = data.get("signedRenewalInfo").and_then(serde_json::Value::as_str);

        let transaction = signed_transaction_info
            .map(|jws| verify_and_decode(jws, &self.trust_anchors, self.require_trust))
            .transpose()?
            .map(|payload| parse_transaction(&payload))
            .transpose()?;
        let renewal = signed_renewal_info
            .map(|jws| verify_and_decode(jws, &self.trust_anchors, self.require_trust))
            .transpose()?
            .map(|payload| parse_renewal_info(&payload));

        let original_transaction_id = transaction
            .as_ref()
            .map(|t| t.original_transaction_id.clone())
            .or_else(|| renewal.as_ref().and_then(|r| r.original_transaction_id.clone()));
        let transaction_id = transaction.as_ref().and_then(|t| t.transaction_id.clone());

        let effective_expire_ms = max_optional(
            transaction.as_ref().and_then(|t| t.expires_date_ms),
            renewal.as_ref().and_then(|r| r.grace_period_expires_date_ms),
        );

        if matches!(class, NotificationClass::Ignore | NotificationClass::Other) {
            self.log_notification(
                &notification_uuid,
                &notification_type,
                subtype.as_deref(),
                original_transaction_id.as_deref(),
                transaction_id.as_deref(),
                environment,
                signed_payload,
                now_ms,
            )
            .await?;
            return Ok(NotificationResult { notification_type, is_vip: None, vip_expire_time_ms: None, duplicate: false });
        }

        let Some(otid) = original_transaction_id.clone() else {
            return Err(EntitlementError::Validation("notification carries no originalTransactionId".to_string()));
        };

        let existing = self.purchase_records.get(&otid).await.map_err(CoreError::from)?;

        let is_stale = matches!(class, NotificationClass::Expired | NotificationClass::InRetry)
            && existing
                .as_ref()
                .and_then(|r| r.expire_date_ms)
                .zip(effective_expire_ms)
                .is_some_and(|(prev, incoming)| incoming < prev);

        if !is_stale {
            let status = match class {
                NotificationClass::Active => PurchaseStatus::Active,
                NotificationClass::InRetry => PurchaseStatus::InRetry,
                NotificationClass::Expired => PurchaseStatus::Expired,
                NotificationClass::Revoked => PurchaseStatus::Revoked,
                NotificationClass::Ignore | NotificationClass::Test | NotificationClass::Other => unreachable!(),
            };
            match existing {
                None => {
                    self.purchase_records
                        .insert(&PurchaseRecord {
                            original_transaction_id: otid.clone(),
                            product_id: transaction.as_ref().map_or_else(String::new, |t| t.product_id.clone()),
                            purchase_date_ms: transaction.as_ref().map_or(now_ms, |t| t.purchase_date_ms),
                            expire_date_ms: effective_expire_ms,
                            status,
                            environment,
                            device_count: 0,
                        })
                        .await
                        .map_err(CoreError::from)?;
                }
                Some(record) => {
                    let mut updated = record.clone();
                    updated.status = status;
                    // Active/in_retry transitions only widen; expired/revoked are
                    // terminal and may narrow.
                    if matches!(class, NotificationClass::Active | NotificationClass::InRetry) {
                        updated.expire_date_ms = max_optional(record.expire_date_ms, effective_expire_ms);
                    } else {
                        updated.expire_date_ms = effective_expire_ms.or(record.expire_date_ms);
                    }
                    self.purchase_records.update(&updated).await.map_err(CoreError::from)?;
                }
            }

            let is_vip = matches!(class, NotificationClass::Active | NotificationClass::InRetry);
            self.users
                .update_vip_status_by_original_transaction_id(&otid, is_vip, effective_expire_ms)
                .await
                .map_err(CoreError::from)?;

            if is_renewal_class(&notification_type) {
                if let Some(txn_id) = &transaction_id {
                    self.purchase_events
                        .append(&PurchaseEventRow {
                            original_transaction_id: otid.clone(),
                            transaction_id: txn_id.clone(),
                            notification_type: notification_type.clone(),
                            environment,
                            created_at_ms: now_ms,
                        })
                        .await
                        .map_err(CoreError::from)?;
                }
            }
        } else {
            warn!(original_transaction_id = %otid, "stale notification effectiveExpireMs < existing; skipping state mutation");
        }

        self.log_notification(
            &notification_uuid,
            &notification_type,
            subtype.as_deref(),
            Some(&otid),
            transaction_id.as_deref(),
            environment,
            signed_payload,
            now_ms,
        )
        .await?;

        Ok(NotificationResult {
            notification_type,
            is_vip: Some(matches!(class, NotificationClass::Active | NotificationClass::InRetry)),
            vip_expire_time_ms: effective_expire_ms,
            duplicate: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_notification(
        &self,
        notification_uuid: &str,
        notification_type: &str,
        subtype: Option<&str>,
        original_transaction_id: Option<&str>,
        transaction_id: Option<&str>,
        environment: Environment,
        signed_payload: &str,
        now_ms: i64,
    ) -> Result<(), EntitlementError> {
        self.notification_logs
            .append(&NotificationLogRow {
                notification_uuid: notification_uuid.to_string(),
                notification_type: notification_type.to_string(),
                subtype: subtype.map(str::to_string),
                original_transaction_id: original_transaction_id.map(str::to_string),
                transaction_id: transaction_id.map(str::to_string),
                environment,
                signed_payload: signed_payload.to_string(),
                created_at_ms: now_ms,
            })
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }
}

const fn event_type_str(event: VerifyPurchaseEvent) -> &'static str {
    match event {
        VerifyPurchaseEvent::Purchase => "purchase",
        VerifyPurchaseEvent::Restore => "restore",
        VerifyPurchaseEvent::Renew => "renew",
    }
}

/// spec.md §4.3.3 step 11: the narrower renewal-class subset of
/// [`NotificationClass::Active`] that also carries a `transactionID` worth
/// recording for analytics/dedup. `RENEWAL_EXTENSION`/`RENEWAL_EXTENDED`/
/// `REFUND_REVERSED` are active but not renewals, so they're excluded here.
fn is_renewal_class(notification_type: &str) -> bool {
    matches!(
        notification_type,
        "SUBSCRIBED" | "DID_RENEW" | "DID_RECOVER" | "INTERACTIVE_RENEWAL"
    )
}

fn max_optional(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_optional_prefers_larger_and_tolerates_nulls() {
        assert_eq!(max_optional(Some(10), Some(20)), Some(20));
        assert_eq!(max_optional(Some(10), None), Some(10));
        assert_eq!(max_optional(None, None), None);
    }

    #[test]
    fn is_renewal_class_matches_only_the_four_step_11_types() {
        for renewal in ["SUBSCRIBED", "DID_RENEW", "DID_RECOVER", "INTERACTIVE_RENEWAL"] {
            assert!(is_renewal_class(renewal), "{renewal} should be a renewal class");
        }
        // Active but not a renewal: excluded from PurchaseEvent recording.
        for not_renewal in ["RENEWAL_EXTENSION", "RENEWAL_EXTENDED", "REFUND_REVERSED", "EXPIRED", "DID_FAIL_TO_RENEW"] {
            assert!(!is_renewal_class(not_renewal), "{not_renewal} should not be a renewal class");
        }
    }
}
