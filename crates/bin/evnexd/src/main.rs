//! # evnexd: Evnex bridge daemon
//!
//! Composition root that wires the adapters together and keeps polling.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Construct the cloud client and the token file (adapters)
//! - Construct the integration, injecting adapters via port traits
//! - Run setup, start background polling, and wait for shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use evnex_bridge_adapter_cloud::EvnexClient;
use evnex_bridge_adapter_token_file::JsonTokenFile;
use evnex_bridge_app::memory_registry::InMemoryRegistry;
use evnex_bridge_app::ports::Integration;
use evnex_bridge_app::services::evnex_integration::EvnexIntegration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter).context("invalid log filter")?)
        .init();

    // Adapters
    let api = Arc::new(EvnexClient::new(config.cloud.clone(), config.credentials())?);
    let tokens = Arc::new(JsonTokenFile::in_dir(&config.integration.config_dir));
    let registry = InMemoryRegistry::new();

    // Integration
    let mut integration = EvnexIntegration::new(api, tokens, config.evnex_settings());
    integration
        .setup(&registry)
        .await
        .context("failed to set up the Evnex integration")?;
    info!(
        devices = registry.devices().len(),
        entities = registry.entities().len(),
        "evnexd running"
    );
    integration.start_background(registry.clone()).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    integration.teardown().await?;

    Ok(())
}
