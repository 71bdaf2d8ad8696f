//! Composition utilities for building repository sets from a `SQLite` pool.
//!
//! Focused purely on construction — no domain logic lives here.

use std::sync::Arc;

use sqlx::SqlitePool;

use bilingo_core::{
    DeviceBindingRepository, NotificationLogRepository, PodcastRepository,
    PurchaseEventRepository, PurchaseRecordRepository, TransactionLogRepository, UserRepository,
};

use crate::repositories::{
    SqliteDeviceBindingRepository, SqliteNotificationLogRepository, SqlitePodcastRepository,
    SqlitePurchaseEventRepository, SqlitePurchaseRecordRepository, SqliteTransactionLogRepository,
    SqliteUserRepository,
};

/// Trait-object-wrapped repository set, handed to the services that compose
/// the Catalogue Service (H3) and Entitlement Processor (H2).
pub struct DbFactory;

impl DbFactory {
    #[must_use]
    pub fn podcast_repository(pool: SqlitePool) -> Arc<dyn PodcastRepository> {
        Arc::new(SqlitePodcastRepository::new(pool))
    }

    #[must_use]
    pub fn user_repository(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(SqliteUserRepository::new(pool))
    }

    #[must_use]
    pub fn purchase_record_repository(pool: SqlitePool) -> Arc<dyn PurchaseRecordRepository> {
        Arc::new(SqlitePurchaseRecordRepository::new(pool))
    }

    #[must_use]
    pub fn device_binding_repository(pool: SqlitePool) -> Arc<dyn DeviceBindingRepository> {
        Arc::new(SqliteDeviceBindingRepository::new(pool))
    }

    #[must_use]
    pub fn transaction_log_repository(pool: SqlitePool) -> Arc<dyn TransactionLogRepository> {
        Arc::new(SqliteTransactionLogRepository::new(pool))
    }

    #[must_use]
    pub fn notification_log_repository(pool: SqlitePool) -> Arc<dyn NotificationLogRepository> {
        Arc::new(SqliteNotificationLogRepository::new(pool))
    }

    #[must_use]
    pub fn purchase_event_repository(pool: SqlitePool) -> Arc<dyn PurchaseEventRepository> {
        Arc::new(SqlitePurchaseEventRepository::new(pool))
    }
}
