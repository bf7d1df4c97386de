// src/main.rs

//! # SSI Registry - Main Entry Point
//!
//! Loads settings, opens the registries on the configured backend and starts
//! the API server.
//!
//! ## Configuration
//! See [`ssi_registry::settings`]. Common variables:
//! - `SSI_SERVER__HOST` / `SSI_SERVER__PORT`: bind address (default 127.0.0.1:3000)
//! - `SSI_STORAGE__BACKEND`: `memory` or `file`
//! - `SSI_STORAGE__DATA_DIR`: table directory for the file backend
//! - `RUST_LOG`: overrides `log_level`

use anyhow::Context;
use dotenv::dotenv;
use env_logger::{Builder, Env};
use log::info;
use ssi_registry::bootstrap::Registries;
use ssi_registry::services::api_server::ApiServer;
use ssi_registry::services::event_log::EventLog;
use ssi_registry::settings::Settings;
use ssi_registry::utils::clock::SystemClock;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::load().context("failed to load settings")?;
    Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str())).init();

    let registries = Registries::open(&settings.storage, Arc::new(SystemClock))
        .with_context(|| format!("failed to open registry storage in {}", settings.storage.data_dir.display()))?;
    let events = Arc::new(EventLog::new(settings.events.capacity));

    let addr = settings
        .bind_address()
        .with_context(|| format!("invalid bind address {}:{}", settings.server.host, settings.server.port))?;

    info!(
        "registries ready: {} identifiers, {} credentials",
        registries.identifiers.count()?,
        registries.credentials.count()?
    );

    let api_server = ApiServer::new(registries, events);
    api_server.run(addr).await.context("API server stopped")?;
    Ok(())
}
