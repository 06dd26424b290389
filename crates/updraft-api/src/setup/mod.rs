//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use updraft_core::Config;
use updraft_storage::{create_store, LocalStore};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    // Initialize telemetry first
    crate::telemetry::init_telemetry();

    tracing::info!("Configuration loaded and validated successfully");

    // Setup database
    let pool = database::setup_database(&config).await?;

    // Setup the active backing store plus the always-on local store used for
    // pre-migration files
    let store = create_store(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage: {}", e))?;
    let local_store = Arc::new(
        LocalStore::new(
            config.local_storage_path.clone(),
            config.local_storage_base_url.clone(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize local storage: {}", e))?,
    );

    // Wire the access-control collaborator
    let access = crate::access::create_access_policy(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize access policy: {}", e))?;

    // Initialize shared state and services
    let state = AppState::new(config.clone(), pool, store, local_store, access)?;

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
