//! Domain types for the bilingual audio-learning platform.
//!
//! These types are independent of any infrastructure concern (database,
//! HTTP, object storage). Timestamps are carried as epoch-millisecond `i64`
//! throughout, matching the wire/storage contract rather than introducing a
//! `chrono` dependency into every call site.

mod episode;
mod podcast;
mod segment;
mod user;

pub use episode::{episode_id, Episode, FeedSource};
pub use podcast::PublishedPodcast;
pub use segment::Segment;
pub use user::{
    DeviceBinding, Environment, NotificationLogRow, PurchaseEventRow, PurchaseRecord,
    PurchaseStatus, TransactionLogRow, User,
};
