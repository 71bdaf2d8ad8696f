//! Repository trait definitions for the catalogue and entitlement stores
//! (M2, M4 in spec.md §2). Implementations must handle all storage details
//! internally — no `sqlx` types appear in any signature here.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{
    DeviceBinding, NotificationLogRow, PublishedPodcast, PurchaseEventRow, PurchaseRecord,
    TransactionLogRow, User,
};

/// Catalogue Store (M4): podcast rows, pagination, "latest-is-free"
/// semantics (spec.md §4.4).
#[async_trait]
pub trait PodcastRepository: Send + Sync {
    /// Insert or replace a podcast row, keyed by its content-addressed id.
    async fn upsert(&self, podcast: &PublishedPodcast) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<PublishedPodcast, RepositoryError>;

    async fn exists(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Distinct `(company, channel)` pairs ordered by `(company, channel)`.
    async fn list_channels(&self) -> Result<Vec<(String, String)>, RepositoryError>;

    /// Distinct UTC day-start epoch seconds for a channel, descending.
    async fn list_dates(&self, company: &str, channel: &str) -> Result<Vec<i64>, RepositoryError>;

    /// Rows where `timestamp_sec ∈ [day_start, day_start + 86400)`, ordered
    /// by `timestamp_sec` descending.
    async fn list_by_day(
        &self,
        company: &str,
        channel: &str,
        day_start: i64,
    ) -> Result<Vec<PublishedPodcast>, RepositoryError>;

    /// Page (1-based) × limit, ordered by `(timestamp_sec DESC, id DESC)`.
    /// Returns `(rows, total_count)`.
    async fn list_paged(
        &self,
        company: &str,
        channel: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<PublishedPodcast>, u64), RepositoryError>;
}

/// Entitlement Store (M2): users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_device_uuid(&self, device_uuid: &str) -> Result<Option<User>, RepositoryError>;

    /// Creates a user for a never-before-seen device uuid.
    async fn create(&self, device_uuid: &str) -> Result<User, RepositoryError>;

    async fn update_vip_status(
        &self,
        device_uuid: &str,
        is_vip: bool,
        vip_expire_ms: Option<i64>,
        original_transaction_id: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Sets `is_vip`/`vip_expire_ms` for every user row bound to the given
    /// `original_transaction_id` (used by the notification handler, which
    /// updates entitlement for all devices sharing a subscription).
    async fn update_vip_status_by_original_transaction_id(
        &self,
        original_transaction_id: &str,
        is_vip: bool,
        vip_expire_ms: Option<i64>,
    ) -> Result<(), RepositoryError>;
}

/// Entitlement Store (M2): purchase records.
#[async_trait]
pub trait PurchaseRecordRepository: Send + Sync {
    async fn get(&self, original_transaction_id: &str) -> Result<Option<PurchaseRecord>, RepositoryError>;

    async fn insert(&self, record: &PurchaseRecord) -> Result<(), RepositoryError>;

    /// Replaces the stored record. Callers are responsible for the
    /// widen-only/narrow-on-terminal invariant (spec.md §3, §9); this
    /// method performs an unconditional write.
    async fn update(&self, record: &PurchaseRecord) -> Result<(), RepositoryError>;

    async fn set_device_count(
        &self,
        original_transaction_id: &str,
        device_count: u32,
    ) -> Result<(), RepositoryError>;
}

/// Entitlement Store (M2) + Device Binder (M3): device bindings.
#[async_trait]
pub trait DeviceBindingRepository: Send + Sync {
    /// Bindings for a subscription, ordered by `last_active_time_ms`
    /// ascending (oldest first — the order the kick policy relies on).
    async fn list_for(&self, original_transaction_id: &str) -> Result<Vec<DeviceBinding>, RepositoryError>;

    async fn get(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
    ) -> Result<Option<DeviceBinding>, RepositoryError>;

    async fn insert(&self, binding: &DeviceBinding) -> Result<(), RepositoryError>;

    async fn touch_last_active(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
        now_ms: i64,
    ) -> Result<(), RepositoryError>;

    async fn delete(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
    ) -> Result<(), RepositoryError>;
}

/// Entitlement Store (M2): append-only transaction log.
#[async_trait]
pub trait TransactionLogRepository: Send + Sync {
    async fn append(&self, row: &TransactionLogRow) -> Result<(), RepositoryError>;
}

/// Entitlement Store (M2): append-only notification log, the idempotency
/// ledger for App Store Server Notifications.
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn exists(&self, notification_uuid: &str) -> Result<bool, RepositoryError>;

    async fn append(&self, row: &NotificationLogRow) -> Result<(), RepositoryError>;
}

/// Entitlement Store (M2): append-only renewal-class purchase events
/// (spec.md §4.3.3 step 11), kept for analytics/dedup.
#[async_trait]
pub trait PurchaseEventRepository: Send + Sync {
    async fn append(&self, row: &PurchaseEventRow) -> Result<(), RepositoryError>;
}
