//! Apple StoreKit 2 receipt verification, subscription lifecycle transitions,
//! and device-binding policy (spec.md §4.3).

mod device_binder;
mod error;
mod jws;
mod notification;
mod processor;
mod transaction;

pub use device_binder::{BindOutcome, DeviceBinder, MAX_DEVICES};
pub use error::EntitlementError;
pub use jws::{verify_and_decode, JwsError, TrustAnchors};
pub use notification::{classify, NotificationClass};
pub use processor::{
    EntitlementProcessor, NotificationResult, VerifyPurchaseEvent, VerifyPurchaseRequest,
    VerifyPurchaseResult,
};
pub use transaction::{parse_renewal_info, parse_transaction, RenewalInfo, Transaction};
