//! GardenerCluster Controller
//!
//! Keeps the kubeconfig secret of every `GardenerCluster` filled with a
//! short-lived admin kubeconfig of its Shoot and renews it before it expires.

mod config;
mod controller;
mod error;
mod reconciler;
mod reconciler_test;
mod store;
mod test_utils;
mod watcher;

use anyhow::Result;
use config::GardenerClusterControllerConfig;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting GardenerCluster Controller");

    let config = GardenerClusterControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Gardener project: {}", config.gardener_project_name);
    info!("  Watch namespace: {}", config.watch_namespace);
    info!("  Rotation period: {:?}", config.rotation_period);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
