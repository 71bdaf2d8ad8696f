//! HTTP transport (H3 + H2's external surface, spec.md §6): catalogue,
//! entitlement, and ingestion-admin routes over axum, grounded on
//! `gglib-axum`'s router/state/error layering.

mod auth;
mod error;
mod handlers;
mod routes;
mod state;

pub use auth::create_access_token;
pub use error::HttpError;
pub use routes::build_router;
pub use state::{AppContext, AppState};
