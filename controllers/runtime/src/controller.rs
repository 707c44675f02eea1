//! Main controller implementation.
//!
//! Wires the Gardener client, the Runtime store and the data sources into a
//! [`Reconciler`], then runs the Runtime watcher next to the metrics server.

use crate::config::RuntimeControllerConfig;
use crate::error::ControllerError;
use crate::metrics::PrometheusMetrics;
use crate::reconciler::Reconciler;
use crate::server;
use crate::store::KubeRuntimeStore;
use crate::watcher::Watcher;
use crds::Runtime;
use gardener_client::GardenerClient;
use kube::{Api, Client};
use shoot_converter::{
    AuditLogDataSource, FileAuditLogDataSource, FileMaintenanceWindowSource, MaintenanceWindowSource,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Main controller for Runtime resources.
pub struct Controller {
    runtime_watcher: JoinHandle<Result<(), ControllerError>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Controller")
    }
}

impl Controller {
    /// Creates the controller and starts its background tasks.
    pub async fn new(config: RuntimeControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Runtime Controller");

        let kube_client = Client::try_default().await?;

        let gardener_client =
            GardenerClient::from_kubeconfig(&config.gardener_kubeconfig_path, &config.gardener_project_name)
                .await
                .inspect_err(|e| {
                    error!(
                        "Failed to create Gardener client from {}: {}",
                        config.gardener_kubeconfig_path, e
                    );
                })?;

        let audit_log = load_audit_log_source(&config)?;
        let maintenance_windows = load_maintenance_window_source(&config);

        let metrics = Arc::new(PrometheusMetrics::new()?);

        let reconciler = Arc::new(Reconciler::new(
            Box::new(gardener_client),
            Box::new(KubeRuntimeStore::new(kube_client.clone())),
            metrics.clone(),
            audit_log,
            maintenance_windows,
            config.converter.clone(),
            config.audit_log_mandatory,
            config.requeue_after,
        ));

        let runtime_api: Api<Runtime> = Api::namespaced(kube_client, &config.watch_namespace);
        let watcher = Watcher::new(reconciler, runtime_api, config.concurrency, config.reconcile_timeout);

        let runtime_watcher = tokio::spawn(async move { watcher.watch_runtimes().await });
        let metrics_port = config.metrics_port;
        let metrics_server = tokio::spawn(async move { server::run_server(metrics, metrics_port).await });

        Ok(Self {
            runtime_watcher,
            metrics_server,
        })
    }

    /// Runs until the watcher or the metrics server stops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Runtime Controller running");

        tokio::select! {
            result = &mut self.runtime_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Runtime watcher panicked: {e}")))?
                    .map_err(|e| ControllerError::Watch(format!("Runtime watcher error: {e}")))?;
            }
            result = &mut self.metrics_server => {
                result.map_err(|e| ControllerError::Watch(format!("Metrics server panicked: {e}")))??;
            }
        }

        Ok(())
    }
}

/// A mandatory audit log requires a readable tenant file; otherwise a broken
/// file only disables audit logs.
fn load_audit_log_source(
    config: &RuntimeControllerConfig,
) -> Result<Option<Box<dyn AuditLogDataSource>>, ControllerError> {
    let path = &config.converter.audit_log.tenant_config_path;
    if path.is_empty() {
        return Ok(None);
    }
    match FileAuditLogDataSource::from_path(path) {
        Ok(source) => {
            info!("Loaded audit log tenants from {}", path);
            Ok(Some(Box::new(source)))
        }
        Err(e) if config.audit_log_mandatory => Err(ControllerError::InvalidConfig(format!(
            "cannot load audit log tenants: {e}"
        ))),
        Err(e) => {
            warn!("Audit logs disabled, cannot load tenants: {}", e);
            Ok(None)
        }
    }
}

fn load_maintenance_window_source(config: &RuntimeControllerConfig) -> Option<Box<dyn MaintenanceWindowSource>> {
    let path = config.converter.maintenance_window.window_map_path.as_deref()?;
    match FileMaintenanceWindowSource::from_path(path) {
        Ok(source) => {
            info!("Loaded maintenance windows from {}", path);
            Some(Box::new(source))
        }
        Err(e) => {
            warn!("Maintenance windows disabled: {}", e);
            None
        }
    }
}
