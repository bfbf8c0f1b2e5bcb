//! Central Constants
//!
//! Single source of truth for the feature/class layout and the defaults
//! that `Config` falls back to.

/// Number of measurements in a feature vector
pub const N_FEATURES: usize = 4;

/// Number of target classes
pub const N_CLASSES: usize = 3;

/// Class names, positionally aligned with class indices 0..2
pub const CLASS_NAMES: [&str; N_CLASSES] = ["Setosa", "Versicolor", "Virginica"];

/// Feature names in the order they appear in the vector
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "Sepal Length",
    "Sepal Width",
    "Petal Length",
    "Petal Width",
];

/// Model family reported by `/api/model/info`
pub const MODEL_TYPE: &str = "RandomForestClassifier";

/// Service version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Defaults
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_MODEL_PATH: &str = "models/iris_model.json";
pub const DEFAULT_SCALER_PATH: &str = "models/scaler.json";

pub const DEFAULT_N_ESTIMATORS: u16 = 100;
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Rate limiting is configurable but never enforced
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
