//! Artifact Store
//!
//! Persists the model and scaler as two JSON blobs. Each blob carries the
//! pair id of the training run that produced it; a model and scaler from
//! different runs are never loaded together.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{N_CLASSES, N_FEATURES};

use super::forest::RandomForestClassifier;
use super::scaler::StandardScaler;

/// Bump when the blob layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {path} has format version {found}, expected {expected}")]
    FormatVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("model and scaler come from different training runs ({model} vs {scaler})")]
    PairMismatch { model: Uuid, scaler: Uuid },

    #[error("invalid model artifact: {0}")]
    InvalidModel(String),
}

/// A model/scaler pair as read back from the store
#[derive(Debug, Clone)]
pub struct StoredPair {
    pub model: RandomForestClassifier,
    pub scaler: StandardScaler,
    pub pair_id: Uuid,
}

/// Where trained artifacts live
pub trait ArtifactStore: Send + Sync {
    /// Both artifacts are present
    fn exists(&self) -> bool;

    fn load(&self) -> Result<StoredPair, StoreError>;

    fn save(&self, model: &RandomForestClassifier, scaler: &StandardScaler, pair_id: Uuid) -> Result<(), StoreError>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    pair_id: Uuid,
    payload: T,
}

/// Filesystem store at two fixed paths
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    model_path: PathBuf,
    scaler_path: PathBuf,
}

impl FsArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path: scaler_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn scaler_path(&self) -> &Path {
        &self.scaler_path
    }
}

fn write_blob<T: Serialize>(path: &Path, pair_id: Uuid, payload: &T) -> Result<(), StoreError> {
    // Ensure directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let envelope = Envelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        pair_id,
        payload,
    };
    let json = serde_json::to_vec(&envelope).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<(Uuid, T), StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let envelope: Envelope<T> = serde_json::from_slice(&data).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(StoreError::FormatVersion {
            path: path.to_path_buf(),
            found: envelope.format_version,
            expected: ARTIFACT_FORMAT_VERSION,
        });
    }

    Ok((envelope.pair_id, envelope.payload))
}

/// The pair must fit the served feature/class layout, not just each other
fn check_serving_shape(model: &RandomForestClassifier, scaler: &StandardScaler) -> Result<(), String> {
    if model.n_features() != N_FEATURES {
        return Err(format!("model expects {} features, service sends {}", model.n_features(), N_FEATURES));
    }
    if model.n_classes() != N_CLASSES {
        return Err(format!("model has {} classes, service expects {}", model.n_classes(), N_CLASSES));
    }
    if scaler.n_features() != N_FEATURES || scaler.scale.len() != N_FEATURES {
        return Err(format!("scaler has {} features, service sends {}", scaler.n_features(), N_FEATURES));
    }
    if scaler.mean.iter().any(|m| !m.is_finite()) {
        return Err("scaler mean is not finite".to_string());
    }
    if scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
        return Err("scaler scale must be finite and nonzero".to_string());
    }
    Ok(())
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self) -> bool {
        self.model_path.exists() && self.scaler_path.exists()
    }

    fn load(&self) -> Result<StoredPair, StoreError> {
        let (model_id, model): (Uuid, RandomForestClassifier) = read_blob(&self.model_path)?;
        let (scaler_id, scaler): (Uuid, StandardScaler) = read_blob(&self.scaler_path)?;

        if model_id != scaler_id {
            return Err(StoreError::PairMismatch {
                model: model_id,
                scaler: scaler_id,
            });
        }

        model.validate().map_err(StoreError::InvalidModel)?;
        check_serving_shape(&model, &scaler).map_err(StoreError::InvalidModel)?;

        Ok(StoredPair {
            model,
            scaler,
            pair_id: model_id,
        })
    }

    fn save(&self, model: &RandomForestClassifier, scaler: &StandardScaler, pair_id: Uuid) -> Result<(), StoreError> {
        write_blob(&self.scaler_path, pair_id, scaler)?;
        write_blob(&self.model_path, pair_id, model)?;
        tracing::debug!("Artifacts written to {}", self.location());
        Ok(())
    }

    fn location(&self) -> String {
        format!("{} + {}", self.model_path.display(), self.scaler_path.display())
    }
}
