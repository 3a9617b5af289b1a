//! Application setup and initialization
//!
//! Startup order: validate configuration, install tracing, connect the metadata
//! store, build the storage backend, wire services, then mount routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use scholar_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment(), config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, pool, storage)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
