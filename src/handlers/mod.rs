//! HTTP handlers

pub mod health;
pub mod metrics;
pub mod model_info;
pub mod predict;


use axum::http::Uri;

use crate::AppError;

/// Current time as an RFC 3339 string, used in every response envelope
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fallback for unmapped paths
pub async fn not_found(uri: Uri) -> AppError {
    tracing::warn!("404 error: {}", uri.path());
    AppError::NotFound("Endpoint not found".to_string())
}
