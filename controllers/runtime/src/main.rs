//! Runtime Controller
//!
//! Drives Gardener Shoots for `Runtime` resources: creates them, applies
//! Runtime changes, waits for Gardener's operations and deletes them again
//! when the Runtime goes away.

mod config;
mod controller;
mod error;
mod fsm;
mod metrics;
mod reconciler;
mod reconciler_test;
mod server;
mod store;
mod test_utils;
mod watcher;

use crate::config::RuntimeControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Runtime Controller");

    let config = RuntimeControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Gardener project: {}", config.gardener_project_name);
    info!("  Watch namespace: {}", config.watch_namespace);
    info!("  Requeue after: {:?}", config.requeue_after);
    info!("  Audit log mandatory: {}", config.audit_log_mandatory);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
