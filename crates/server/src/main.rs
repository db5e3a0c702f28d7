//! Ignition forecast service
//!
//! Serves CSV ingestion, ignition forecasts and history queries over HTTP,
//! with health checks and Prometheus metrics.

use anyhow::Result;
use ignition_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    predictor::ModelRegistry,
    store::{MemoryStore, RecordStore},
};
use ignition_server::{api, IgnitionConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting ignition-server");

    let config = IgnitionConfig::load()?;
    info!(
        node_name = %config.node_name,
        model_path = %config.model_path.display(),
        store_path = ?config.store_path,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;

    let store: Box<dyn RecordStore> = match &config.store_path {
        Some(path) => Box::new(MemoryStore::with_persistence(path.clone())?),
        None => Box::new(MemoryStore::new()),
    };
    health_registry.observe_store(&store.counts()).await;

    let registry = Arc::new(ModelRegistry::new(config.model_source()));
    if let Err(e) = registry.load() {
        warn!(error = %e, "Starting without a model; predictions unavailable until reload");
    }
    health_registry.observe_model(&registry).await;

    let logger = StructuredLogger::new(config.node_name.clone());
    let model_version = registry
        .current_version()
        .unwrap_or_else(|| "none".to_string());
    logger.log_startup(SERVICE_VERSION, &model_version);

    let port = config.api_port;
    let app_state = Arc::new(api::AppState::new(
        store,
        registry.clone(),
        health_registry.clone(),
        config,
    ));

    health_registry.set_ready(true).await;

    // Serves until ctrl-c
    api::serve(port, app_state.clone()).await?;

    logger.log_shutdown("SIGINT received");
    registry.unload()?;
    info!("Shutting down");

    Ok(())
}
