#![deny(unsafe_code)]

//! `SQLite` repository implementations for the bilingual audio-learning
//! platform: the Catalogue Store (M4) and Entitlement Store (M2) from
//! spec.md §2.

pub mod factory;
pub mod repositories;
pub mod setup;

pub use factory::DbFactory;
pub use repositories::{
    SqliteDeviceBindingRepository, SqliteNotificationLogRepository, SqlitePodcastRepository,
    SqlitePurchaseEventRepository, SqlitePurchaseRecordRepository, SqliteTransactionLogRepository,
    SqliteUserRepository,
};
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
