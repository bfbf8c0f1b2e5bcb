//! Inference Service
//!
//! Scaler then forest, shaped into a `PredictionResult`. Stateless apart from
//! the shared read-only model context.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::ArrayView1;
use serde::Serialize;
use serde_json::Value;

use crate::constants::{CLASS_NAMES, N_FEATURES};

use super::forest::argmax;
use super::lifecycle::ModelContext;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("X has {actual} features, but the model is expecting {expected} features as input")]
    FeatureCount { expected: usize, actual: usize },

    #[error("could not convert string to float: '{0}'")]
    NotNumeric(String),

    #[error("Input contains NaN")]
    Missing,

    #[error("unsupported feature value: {0}")]
    Unsupported(String),

    #[error("model predicted unknown class index {0}")]
    UnknownClass(usize),
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// The 4 measurements of one flower
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; N_FEATURES]);

impl FeatureVector {
    pub fn as_view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.0[..])
    }

    /// Materialise raw JSON values as numbers.
    ///
    /// Numbers and booleans convert directly and numeric strings are parsed.
    /// Callers have already checked the element count.
    pub fn from_json_values(values: &[Value]) -> Result<Self, InferenceError> {
        if values.len() != N_FEATURES {
            return Err(InferenceError::FeatureCount {
                expected: N_FEATURES,
                actual: values.len(),
            });
        }

        let mut out = [0.0; N_FEATURES];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = json_to_f64(value)?;
        }
        Ok(Self(out))
    }
}

impl From<[f64; N_FEATURES]> for FeatureVector {
    fn from(values: [f64; N_FEATURES]) -> Self {
        Self(values)
    }
}

fn json_to_f64(value: &Value) -> Result<f64, InferenceError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| InferenceError::Unsupported(n.to_string())),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_nan() => Err(InferenceError::Missing),
            Ok(v) => Ok(v),
            Err(_) => Err(InferenceError::NotNumeric(s.clone())),
        },
        Value::Null => Err(InferenceError::Missing),
        other => Err(InferenceError::Unsupported(other.to_string())),
    }
}

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Class index 0..2
    pub prediction: usize,
    #[serde(rename = "class")]
    pub class_name: String,
    /// Highest class probability
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Clone)]
pub struct InferenceService {
    context: Arc<ModelContext>,
}

impl InferenceService {
    pub fn new(context: Arc<ModelContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        let scaled = self.context.scaler.transform_row(features.as_view())?;
        let probability = self.context.model.predict_proba(scaled.view())?;

        let prediction = argmax(&probability);
        let class_name = CLASS_NAMES
            .get(prediction)
            .ok_or(InferenceError::UnknownClass(prediction))?
            .to_string();
        let confidence = probability[prediction];

        let probabilities = CLASS_NAMES
            .iter()
            .zip(&probability)
            .map(|(name, p)| (name.to_string(), *p))
            .collect();

        Ok(PredictionResult {
            prediction,
            class_name,
            confidence,
            probabilities,
        })
    }
}
