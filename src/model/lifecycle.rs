//! Model Lifecycle
//!
//! Runs once at startup: load the artifact pair from the store, or train a
//! fresh pair and write it back. Any load failure falls back to training;
//! only a training failure is returned to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::forest::RandomForestClassifier;
use super::scaler::StandardScaler;
use super::store::{ArtifactStore, StoredPair};
use super::trainer::{TrainedModel, Trainer, TrainingError};

/// Where the served model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Disk,
    Training,
}

/// Provenance of the served model
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub source: ModelSource,
    pub loaded_at: DateTime<Utc>,
    pub pair_id: Uuid,
    /// Why present artifacts could not be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_accuracy: Option<f64>,
}

/// Result of the load step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Retrained { reason: Option<String> },
}

/// Immutable model state shared with every request
#[derive(Debug, Clone)]
pub struct ModelContext {
    pub model: RandomForestClassifier,
    pub scaler: StandardScaler,
    pub metadata: ModelMetadata,
}

impl ModelContext {
    pub fn from_training(trained: TrainedModel) -> Self {
        Self {
            metadata: ModelMetadata {
                source: ModelSource::Training,
                loaded_at: Utc::now(),
                pair_id: trained.pair_id,
                fallback_reason: None,
                training_accuracy: Some(trained.training_accuracy),
            },
            model: trained.model,
            scaler: trained.scaler,
        }
    }

    pub fn from_store(stored: StoredPair) -> Self {
        Self {
            metadata: ModelMetadata {
                source: ModelSource::Disk,
                loaded_at: Utc::now(),
                pair_id: stored.pair_id,
                fallback_reason: None,
                training_accuracy: None,
            },
            model: stored.model,
            scaler: stored.scaler,
        }
    }
}

/// Load the artifact pair, or train and persist a new one
pub fn ensure_model_ready(
    store: &dyn ArtifactStore,
    trainer: &Trainer,
) -> Result<(ModelContext, LoadOutcome), TrainingError> {
    let mut fallback_reason = None;

    if store.exists() {
        tracing::info!("Loading existing model from {}", store.location());
        match store.load() {
            Ok(stored) => {
                let context = ModelContext::from_store(stored);
                tracing::info!("Model loaded successfully (pair {})", context.metadata.pair_id);
                return Ok((context, LoadOutcome::Loaded));
            }
            Err(e) => {
                // Corrupt and missing artifacts are handled alike
                tracing::error!("Error loading model: {}. Retraining", e);
                fallback_reason = Some(e.to_string());
            }
        }
    } else {
        tracing::info!("No artifacts at {}, training new model", store.location());
    }

    let trained = trainer.train()?;

    if let Err(e) = store.save(&trained.model, &trained.scaler, trained.pair_id) {
        tracing::error!("Failed to persist trained model: {}", e);
    }

    let mut context = ModelContext::from_training(trained);
    context.metadata.fallback_reason = fallback_reason.clone();
    context.metadata.loaded_at = Utc::now();

    tracing::info!("Model ready (pair {})", context.metadata.pair_id);
    Ok((context, LoadOutcome::Retrained { reason: fallback_reason }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forest::ForestParams;
    use crate::model::dataset::DatasetKind;
    use crate::model::inference::{FeatureVector, InferenceService};
    use crate::model::store::{FsArtifactStore, StoreError};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fs_store(dir: &std::path::Path) -> FsArtifactStore {
        FsArtifactStore::new(dir.join("models/iris_model.json"), dir.join("models/scaler.json"))
    }

    /// Store that never holds artifacts and refuses writes
    struct ReadOnlyEmptyStore {
        saves: AtomicUsize,
    }

    impl ArtifactStore for ReadOnlyEmptyStore {
        fn exists(&self) -> bool {
            false
        }

        fn load(&self) -> Result<StoredPair, StoreError> {
            Err(StoreError::NotFound("nowhere".into()))
        }

        fn save(&self, _: &RandomForestClassifier, _: &StandardScaler, _: Uuid) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Io {
                path: "nowhere".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn location(&self) -> String {
            "read-only".to_string()
        }
    }

    #[test]
    fn test_trains_and_persists_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let (context, outcome) = ensure_model_ready(&store, &Trainer::default()).unwrap();
        assert_eq!(outcome, LoadOutcome::Retrained { reason: None });
        assert_eq!(context.metadata.source, ModelSource::Training);
        assert!(context.metadata.training_accuracy.is_some());
        assert!(store.exists());
    }

    #[test]
    fn test_second_start_loads_from_disk_with_same_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let (first, _) = ensure_model_ready(&store, &Trainer::default()).unwrap();
        let (second, outcome) = ensure_model_ready(&store, &Trainer::default()).unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(second.metadata.source, ModelSource::Disk);
        assert_eq!(second.metadata.pair_id, first.metadata.pair_id);

        let a = InferenceService::new(Arc::new(first));
        let b = InferenceService::new(Arc::new(second));
        for features in [[5.1, 3.5, 1.4, 0.2], [7.0, 3.2, 4.7, 1.4], [6.3, 3.3, 6.0, 2.5], [6.1, 2.8, 4.9, 1.7]] {
            let fv = FeatureVector(features);
            assert_eq!(a.predict(&fv).unwrap(), b.predict(&fv).unwrap());
        }
    }

    #[test]
    fn test_corrupt_artifact_falls_back_to_training() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());
        ensure_model_ready(&store, &Trainer::default()).unwrap();

        fs::write(store.model_path(), b"{ truncated").unwrap();

        let (context, outcome) = ensure_model_ready(&store, &Trainer::default()).unwrap();
        match outcome {
            LoadOutcome::Retrained { reason: Some(reason) } => assert!(reason.contains("malformed")),
            other => panic!("Expected retrain with reason, got {:?}", other),
        }
        assert_eq!(context.metadata.source, ModelSource::Training);
        assert!(context.metadata.fallback_reason.is_some());

        // The retrained pair replaced the corrupt one
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_save_failure_still_serves_model() {
        let store = ReadOnlyEmptyStore { saves: AtomicUsize::new(0) };
        let (context, outcome) = ensure_model_ready(&store, &Trainer::default()).unwrap();

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, LoadOutcome::Retrained { reason: None });
        assert_eq!(context.model.n_trees(), 100);
    }

    #[test]
    fn test_training_failure_propagates() {
        let store = ReadOnlyEmptyStore { saves: AtomicUsize::new(0) };
        let trainer = Trainer::new(DatasetKind::Sample, ForestParams::default().with_n_trees(0));
        assert!(matches!(
            ensure_model_ready(&store, &trainer),
            Err(TrainingError::InvalidParams(_))
        ));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_metadata_serializes_source_lowercase() {
        let (context, _) = ensure_model_ready(
            &ReadOnlyEmptyStore { saves: AtomicUsize::new(0) },
            &Trainer::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&context.metadata).unwrap();
        assert_eq!(json["source"], "training");
        assert!(json.get("loaded_at").is_some());
        assert!(json.get("fallback_reason").is_none());
    }
}
