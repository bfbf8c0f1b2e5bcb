//! Iris inference server binary
//!
//! Loads or trains the model before binding, so every accepted connection
//! sees a ready model.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use iris_serve::config::Config;
use iris_serve::model::{ensure_model_ready, FsArtifactStore, LoadOutcome, Trainer};
use iris_serve::{create_router, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    logging::init(config.log_format);

    tracing::info!("Starting iris inference server ({})", config.environment);
    if config.rate_limit.enabled {
        tracing::warn!(
            "Rate limiting configured ({} requests / {}s) but not enforced",
            config.rate_limit.requests,
            config.rate_limit.window_secs
        );
    }

    // Model lifecycle
    let store = FsArtifactStore::new(&config.model_path, &config.scaler_path);
    let trainer = Trainer::from_config(&config);
    let (context, outcome) = tokio::task::spawn_blocking(move || ensure_model_ready(&store, &trainer))
        .await
        .context("model lifecycle task panicked")?
        .context("failed to train model")?;

    match &outcome {
        LoadOutcome::Loaded => tracing::info!("Serving model loaded from disk"),
        LoadOutcome::Retrained { reason: Some(reason) } => {
            tracing::warn!("Serving retrained model; stored artifacts were unusable: {}", reason)
        }
        LoadOutcome::Retrained { reason: None } => tracing::info!("Serving freshly trained model"),
    }

    // Build router
    let state = AppState::new(Arc::new(context));
    let app = create_router(state);

    // Start server
    let ip = config.host.parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid HOST: {}", config.host))?;
    let addr = SocketAddr::new(ip, config.port);
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
