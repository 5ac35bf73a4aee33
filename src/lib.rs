//! Logmedic -- ML-powered anomaly scoring for service log traffic.
//!
//! This crate provides the anomaly-scoring engine (feature extraction,
//! rare-word vocabulary, isolation-forest detector with its feature scaler,
//! artifact persistence) and the HTTP API that exposes it.

pub mod api;
pub mod detect;
pub mod storage;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

/// Start the logmedic daemon: load or train the model, then serve the API.
pub async fn serve(bind: &str, models_dir: &Path) -> Result<()> {
    // 1. Load persisted artifacts, or bootstrap-train and persist them
    tracing::info!(dir = %models_dir.display(), "Initializing scoring engine");
    let scoring = storage::load_or_train(models_dir, detect::train::DEFAULT_SEED)?;

    // 2. Start API server; detector and scaler are shared read-only
    let state = api::state::AppState {
        scoring: Arc::new(scoring),
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "logmedic listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
