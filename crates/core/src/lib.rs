//! Domain types, port definitions, and cross-cutting services for the
//! bilingual audio-learning platform backend.

pub mod domain;
pub mod ports;
pub mod services;

pub use domain::{
    episode_id, DeviceBinding, Environment, Episode, FeedSource, NotificationLogRow,
    PublishedPodcast, PurchaseEventRow, PurchaseRecord, PurchaseStatus, Segment, TransactionLogRow,
    User,
};
pub use ports::{
    AsrError, AsrPort, CoreError, DeviceBindingRepository, LlmError, LlmProviderPort,
    NotificationLogRepository, ObjectStoreError, ObjectStorePort, PodcastRepository,
    PurchaseEventRepository, PurchaseRecordRepository, RepositoryError, TransactionLogRepository,
    UserRepository,
};
pub use services::{CatalogueService, PodcastDetail, PodcastSummary};
