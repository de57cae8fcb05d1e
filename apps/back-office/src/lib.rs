//! # Bistro Back Office
//!
//! JSON API for the restaurant dashboard: accounts, menu, inventory,
//! orders, billing and the daily dashboard.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Back Office Server                               │
//! │                                                                         │
//! │   Request ──► CorsLayer ──► TraceLayer ──► Router                       │
//! │                                              │                          │
//! │                      ┌───────────────────────┼──────────────────────┐   │
//! │                      ▼                       ▼                      ▼   │
//! │               /users/* (auth)     /menu-items, /inventory     /health  │
//! │                                   /orders, /billing-history             │
//! │                                   /dashboard                            │
//! │                                              │                          │
//! │                              AuthAccount ──► AccountScope               │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                     bistro-db repositories              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router is built by [`router`] so integration tests can drive it
//! without binding a socket.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use bistro_db::Database;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub use config::BackOfficeConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<BackOfficeConfig>,
}

impl AppState {
    pub fn new(db: Database, config: BackOfficeConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete HTTP application.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    handlers::routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
