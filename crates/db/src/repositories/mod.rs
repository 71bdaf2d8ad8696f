//! `SQLite` repository implementations, one module per port defined in
//! `bilingo_core::ports`.

mod device_binding_repository;
mod notification_log_repository;
mod podcast_repository;
mod purchase_event_repository;
mod purchase_record_repository;
mod transaction_log_repository;
mod user_repository;

pub use device_binding_repository::SqliteDeviceBindingRepository;
pub use notification_log_repository::SqliteNotificationLogRepository;
pub use podcast_repository::SqlitePodcastRepository;
pub use purchase_event_repository::SqlitePurchaseEventRepository;
pub use purchase_record_repository::SqlitePurchaseRecordRepository;
pub use transaction_log_repository::SqliteTransactionLogRepository;
pub use user_repository::SqliteUserRepository;
