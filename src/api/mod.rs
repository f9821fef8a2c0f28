// src/api/mod.rs
//! HTTP control API
//!
//! A small JSON API for external controllers: health and snapshot reads,
//! settings updates, and start/stop/reload/switch actions. A web UI found in
//! the data directory is served alongside. Every route sits behind the
//! optional [`auth`] gate.

/// Token and Basic authentication
pub mod auth;

/// Route handlers
pub mod handlers;

/// Listener lifecycle
pub mod server;

pub use auth::AuthConfig;
pub use server::{WebApi, parse_bind};

use crate::miner::MinerService;
use crate::utils::logging::LogSink;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Controlled service
    pub service: Arc<MinerService>,
    /// Log target for request handling
    pub sink: LogSink,
}

/// Builds the router with all routes behind the auth gate
///
/// `webui` adds `/` and `/webui/*` when the directory exists.
pub fn create_routes(state: AppState, auth: Arc<AuthConfig>, webui: Option<&Path>) -> Router {
    let mut router = Router::new();
    if let Some(dir) = webui.filter(|dir| dir.is_dir()) {
        let index = dir.join("index.html");
        router = router
            .route("/", get(move || handlers::webui_index(index.clone())))
            .nest_service("/webui", ServeDir::new(dir));
    }
    router
        .route("/api/health", get(handlers::health))
        .route("/api/snapshot", get(handlers::snapshot))
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::put_settings),
        )
        .route("/api/actions/reload", post(handlers::reload))
        .route("/api/actions/start", post(handlers::start))
        .route("/api/actions/stop", post(handlers::stop))
        .route("/api/actions/switch-channel", post(handlers::switch_channel))
        .layer(middleware::from_fn_with_state(auth, auth::auth_middleware))
        .with_state(state)
}
