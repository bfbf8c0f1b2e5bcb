//! Offline trainer
//!
//! Trains on the full 150-sample iris dataset and writes the artifact pair
//! to the configured paths. The server picks it up on its next start.

use anyhow::Context;

use iris_serve::config::Config;
use iris_serve::constants::{CLASS_NAMES, FEATURE_NAMES};
use iris_serve::logging;
use iris_serve::model::dataset::DatasetKind;
use iris_serve::model::{ArtifactStore, FsArtifactStore, Trainer};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    logging::init(config.log_format);

    let mut trainer = Trainer::from_config(&config);
    trainer.dataset = DatasetKind::Iris;

    let dataset = trainer.dataset.load()?;
    tracing::info!("Dataset shape: {:?}", dataset.features.dim());
    tracing::info!("Classes: {:?}", CLASS_NAMES);

    let trained = trainer.train().context("training failed")?;

    let store = FsArtifactStore::new(&config.model_path, &config.scaler_path);
    store
        .save(&trained.model, &trained.scaler, trained.pair_id)
        .with_context(|| format!("failed to write artifacts to {}", store.location()))?;
    tracing::info!("Model saved to {}", store.model_path().display());
    tracing::info!("Scaler saved to {}", store.scaler_path().display());

    tracing::info!("Feature importance:");
    for (name, importance) in FEATURE_NAMES.iter().zip(trained.model.feature_importances()) {
        tracing::info!("  {}: {:.4}", name, importance);
    }

    tracing::info!("Training accuracy: {:.4}", trained.training_accuracy);
    Ok(())
}
