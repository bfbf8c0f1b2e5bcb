//! Model Module - training, persistence and inference
//!
//! Startup runs `lifecycle::ensure_model_ready` once; the resulting
//! `ModelContext` is shared read-only with the `InferenceService`.

pub mod dataset;
pub mod forest;
pub mod inference;
pub mod lifecycle;
pub mod scaler;
pub mod store;
pub mod trainer;

// Re-export common types
pub use inference::{FeatureVector, InferenceError, InferenceService, PredictionResult};
pub use lifecycle::{ensure_model_ready, LoadOutcome, ModelContext, ModelMetadata, ModelSource};
pub use store::{ArtifactStore, FsArtifactStore, StoreError};
pub use trainer::{TrainedModel, Trainer, TrainingError};
