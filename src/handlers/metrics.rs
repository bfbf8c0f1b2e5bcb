//! Metrics handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::constants::APP_VERSION;
use crate::AppState;

#[derive(Serialize)]
pub struct MetricsResponse {
    timestamp: String,
    model_status: &'static str,
    version: &'static str,
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        timestamp: super::timestamp(),
        model_status: if state.model_loaded() { "loaded" } else { "not_loaded" },
        version: APP_VERSION,
    })
}
