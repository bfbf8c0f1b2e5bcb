//! Iris Inference Server
//!
//! Serves a random forest iris classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//!   startup                          requests
//!   ───────                          ────────
//!   Config::from_env                 Router (Axum)
//!        │                                │
//!        ▼                                ▼
//!   ensure_model_ready ──────────▶  InferenceService
//!   (load pair or train + save)     scaler → forest
//!        │                                ▲
//!        ▼                                │
//!   ArtifactStore              Arc<ModelContext> (read-only)
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod model;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use model::{InferenceService, ModelContext};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inference: InferenceService,
}

impl AppState {
    pub fn new(context: Arc<ModelContext>) -> Self {
        Self {
            inference: InferenceService::new(context),
        }
    }

    /// The state can only be built from a ready model, so this holds for
    /// every request the router serves
    pub fn model_loaded(&self) -> bool {
        self.inference.context().model.n_trees() > 0
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/predict", post(handlers::predict::predict))
        .route("/api/model/info", get(handlers::model_info::info))
        .route("/api/metrics", get(handlers::metrics::metrics))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
