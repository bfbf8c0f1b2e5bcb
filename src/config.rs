//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_MODEL_PATH, DEFAULT_N_ESTIMATORS, DEFAULT_PORT,
    DEFAULT_RANDOM_SEED, DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS,
    DEFAULT_SCALER_PATH,
};
use crate::model::dataset::DatasetKind;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Rate limit settings. Parsed and reported, never enforced.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Model artifact location
    pub model_path: PathBuf,

    /// Scaler artifact location
    pub scaler_path: PathBuf,

    /// Number of trees in the forest
    pub n_estimators: u16,

    /// Optional tree depth limit
    pub max_depth: Option<usize>,

    /// Seed for bootstrap and feature sampling
    pub random_seed: u64,

    /// Dataset the server trains on when no artifacts are usable
    pub training_dataset: DatasetKind,

    pub log_format: LogFormat,

    pub rate_limit: RateLimitConfig,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: None,
            random_seed: DEFAULT_RANDOM_SEED,
            training_dataset: DatasetKind::Sample,
            log_format: LogFormat::Pretty,
            rate_limit: RateLimitConfig::default(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to
    /// defaults for missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            scaler_path: lookup("SCALER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.scaler_path),

            n_estimators: lookup("N_ESTIMATORS")
                .and_then(|n| n.parse::<u16>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.n_estimators),

            max_depth: lookup("MAX_DEPTH")
                .and_then(|d| d.parse::<usize>().ok())
                .filter(|d| *d > 0),

            random_seed: lookup("RANDOM_SEED")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.random_seed),

            training_dataset: lookup("TRAINING_DATASET")
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.training_dataset),

            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },

            rate_limit: RateLimitConfig {
                enabled: lookup("RATE_LIMIT_ENABLED")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(defaults.rate_limit.enabled),
                requests: lookup("RATE_LIMIT_REQUESTS")
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(defaults.rate_limit.requests),
                window_secs: lookup("RATE_LIMIT_WINDOW")
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(defaults.rate_limit.window_secs),
            },

            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.port, 5000);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.model_path, PathBuf::from("models/iris_model.json"));
        assert_eq!(config.training_dataset, DatasetKind::Sample);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8081"),
            ("N_ESTIMATORS", "10"),
            ("MAX_DEPTH", "5"),
            ("TRAINING_DATASET", "iris"),
            ("LOG_FORMAT", "json"),
            ("RATE_LIMIT_ENABLED", "true"),
            ("ENVIRONMENT", "production"),
        ]));
        assert_eq!(config.port, 8081);
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.max_depth, Some(5));
        assert_eq!(config.training_dataset, DatasetKind::Iris);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("N_ESTIMATORS", "0"),
            ("TRAINING_DATASET", "mnist"),
        ]));
        assert_eq!(config.port, 5000);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.training_dataset, DatasetKind::Sample);
    }
}
