//! Prediction handler
//!
//! Expected JSON: `{"features": [5.1, 3.5, 1.4, 0.2]}`

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::model::{FeatureVector, PredictionResult};
use crate::{AppError, AppResult, AppState};

const MISSING_FEATURES: &str = "Missing features in request";
const WRONG_FEATURE_COUNT: &str = "Expected 4 features";

#[derive(Debug, Validate)]
struct FeatureInput {
    #[validate(length(equal = 4))]
    values: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    result: PredictionResult,
    timestamp: String,
}

/// Flatten nested arrays the way a numeric reshape would; scalars count as
/// one element
fn flatten_into(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other.clone()),
    }
}

/// Shape validation: body must be a non-empty object with `features`, and
/// `features` must hold exactly 4 elements
pub fn extract_features(body: &[u8]) -> AppResult<Vec<Value>> {
    let data: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest(MISSING_FEATURES.to_string()))?;

    let features = match &data {
        Value::Object(map) if !map.is_empty() => map
            .get("features")
            .ok_or_else(|| AppError::BadRequest(MISSING_FEATURES.to_string()))?,
        _ => return Err(AppError::BadRequest(MISSING_FEATURES.to_string())),
    };

    let mut values = Vec::new();
    flatten_into(features, &mut values);

    let input = FeatureInput { values };
    if input.validate().is_err() {
        tracing::warn!("Invalid feature count: {}", input.values.len());
        return Err(AppError::BadRequest(WRONG_FEATURE_COUNT.to_string()));
    }

    Ok(input.values)
}

pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<PredictResponse>> {
    let values = extract_features(&body)?;

    // Conversion failures are inference errors and surface as 500
    let features = FeatureVector::from_json_values(&values)?;
    let result = state.inference.predict(&features)?;

    tracing::info!(
        "Prediction made: class={}, confidence={:.4}",
        result.class_name,
        result.confidence
    );

    Ok(Json(PredictResponse {
        result,
        timestamp: super::timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_request_message(body: &[u8]) -> String {
        match extract_features(body) {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_body_or_field() {
        let bodies: [&[u8]; 7] = [
            b"",
            b"null",
            b"{}",
            b"[1,2,3,4]",
            b"\"features\"",
            br#"{"data": [1,2,3,4]}"#,
            b"{not json",
        ];
        for body in bodies {
            assert_eq!(bad_request_message(body), MISSING_FEATURES, "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn test_wrong_feature_count() {
        let bodies: [&[u8]; 6] = [
            br#"{"features": [5.1, 3.5, 1.4]}"#,
            br#"{"features": [1.0, 2.0]}"#,
            br#"{"features": []}"#,
            br#"{"features": [1, 2, 3, 4, 5]}"#,
            br#"{"features": 5.1}"#,
            br#"{"features": null}"#,
        ];
        for body in bodies {
            assert_eq!(bad_request_message(body), WRONG_FEATURE_COUNT);
        }
    }

    #[test]
    fn test_nested_arrays_are_flattened() {
        let values = extract_features(br#"{"features": [[5.1, 3.5], [1.4, 0.2]]}"#).unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[2], serde_json::json!(1.4));
    }

    #[test]
    fn test_non_numeric_passes_shape_validation() {
        // Shape is fine; the conversion error is reported later as a 500
        let values = extract_features(br#"{"features": ["a", "b", "c", "d"]}"#).unwrap();
        assert_eq!(values.len(), 4);
    }
}
