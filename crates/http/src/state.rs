//! Shared application state type, grounded on `gglib-axum/src/state.rs`'s
//! `pub type AppState = Arc<AxumContext>` pattern.

use std::sync::Arc;

use bilingo_core::{CatalogueService, DeviceBindingRepository, PodcastRepository, UserRepository};
use entitlement::{DeviceBinder, EntitlementProcessor};

/// Application state shared across all handlers.
pub type AppState = Arc<AppContext>;

/// All services and repository handles a handler might need. Built once
/// at startup by the `cli` composition root.
pub struct AppContext {
    pub catalogue: Arc<CatalogueService>,
    pub entitlement: Arc<EntitlementProcessor>,
    /// A second, independent handle onto the same bind/kick policy used by
    /// [`EntitlementProcessor`] internally — `EntitlementProcessor` owns its
    /// `DeviceBinder` by value rather than exposing it, so the device-list
    /// and device-delete routes (spec.md §6, `/podcast/user/devices`) get
    /// their own instance over the same underlying repositories.
    pub device_binder: DeviceBinder,
    pub users: Arc<dyn UserRepository>,
    pub device_bindings: Arc<dyn DeviceBindingRepository>,
    pub podcasts: Arc<dyn PodcastRepository>,
    pub jwt_secret: String,
    pub internal_token: String,
}
