//! Classification of App Store Server Notification types (spec.md §4.3.3
//! step 6).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationClass {
    Active,
    InRetry,
    Expired,
    Revoked,
    Ignore,
    Test,
    Other,
}

#[must_use]
pub fn classify(notification_type: &str) -> NotificationClass {
    match notification_type {
        "SUBSCRIBED" | "DID_RENEW" | "DID_RECOVER" | "INTERACTIVE_RENEWAL" | "RENEWAL_EXTENSION"
        | "RENEWAL_EXTENDED" | "REFUND_REVERSED" => NotificationClass::Active,
        "DID_FAIL_TO_RENEW" => NotificationClass::InRetry,
        "EXPIRED" | "GRACE_PERIOD_EXPIRED" => NotificationClass::Expired,
        "REFUND" | "REVOKE" => NotificationClass::Revoked,
        "DID_CHANGE_RENEWAL_STATUS" | "DID_CHANGE_RENEWAL_PREF" | "PRICE_INCREASE"
        | "OFFER_REDEEMED" | "CONSUMPTION_REQUEST" => NotificationClass::Ignore,
        "TEST" => NotificationClass::Test,
        _ => NotificationClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_types() {
        assert_eq!(classify("SUBSCRIBED"), NotificationClass::Active);
        assert_eq!(classify("DID_FAIL_TO_RENEW"), NotificationClass::InRetry);
        assert_eq!(classify("EXPIRED"), NotificationClass::Expired);
        assert_eq!(classify("REFUND"), NotificationClass::Revoked);
        assert_eq!(classify("PRICE_INCREASE"), NotificationClass::Ignore);
        assert_eq!(classify("TEST"), NotificationClass::Test);
        assert_eq!(classify("SOMETHING_NEW"), NotificationClass::Other);
    }
}
