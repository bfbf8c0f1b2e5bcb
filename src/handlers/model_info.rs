//! Model info handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::constants::{CLASS_NAMES, MODEL_TYPE, N_CLASSES};
use crate::model::ModelMetadata;
use crate::AppState;

#[derive(Serialize)]
pub struct ModelInfoResponse {
    model_type: &'static str,
    n_estimators: usize,
    classes: [&'static str; N_CLASSES],
    metadata: ModelMetadata,
}

pub async fn info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let context = state.inference.context();
    Json(ModelInfoResponse {
        model_type: MODEL_TYPE,
        n_estimators: context.model.n_trees(),
        classes: CLASS_NAMES,
        metadata: context.metadata.clone(),
    })
}
