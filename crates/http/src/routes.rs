//! Route definitions and router construction, grounded on
//! `gglib-axum/src/routes.rs`'s public/merged-router pattern — the public
//! vs. bearer-protected split here is routing, not in-middleware path
//! inspection (see `auth.rs`).

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_bearer_auth, require_internal_token};
use crate::handlers;
use crate::state::AppState;

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/podcast/info/channels", get(handlers::info::channels))
        .route("/podcast/auth/register", post(handlers::auth::register))
        .route("/podcast/payment/appstore/notify", post(handlers::payment::notify))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/podcast/info/channels/{company}/{channel}/dates", get(handlers::info::dates))
        .route(
            "/podcast/info/channels/{company}/{channel}/podcasts",
            get(handlers::info::podcasts_by_day),
        )
        .route(
            "/podcast/info/channels/{company}/{channel}/podcasts/paged",
            get(handlers::info::podcasts_paged),
        )
        .route("/podcast/info/detail/{id}", get(handlers::info::detail))
        .route("/podcast/info/check/{id}", get(handlers::info::check))
        .route("/podcast/payment/verify", post(handlers::payment::verify))
        .route("/podcast/user/devices", get(handlers::user::list_devices))
        .route("/podcast/user/devices/{target}", delete(handlers::user::delete_device))
        .layer(middleware::from_fn_with_state(state, require_bearer_auth))
}

fn internal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/podcast/info/upload", post(handlers::info::upload))
        .route("/podcast/info/upload/batch", post(handlers::info::upload_batch))
        .layer(middleware::from_fn_with_state(state, require_internal_token))
}

/// Builds the full application router with CORS and request tracing.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(internal_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
