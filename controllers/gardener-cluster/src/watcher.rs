//! Kubernetes resource watchers.
//!
//! GardenerClusters are reconciled through `kube_runtime::Controller`.
//! Deletions reach the reconciler through the GardenerCluster finalizer.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::GardenerCluster;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches GardenerCluster resources.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    api: Api<GardenerCluster>,
    concurrency: u16,
    timeout: Duration,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, api: Api<GardenerCluster>, concurrency: u16, timeout: Duration) -> Self {
        Self {
            reconciler,
            api,
            concurrency,
            timeout,
        }
    }

    pub async fn watch_gardener_clusters(&self) -> Result<(), ControllerError> {
        info!("Starting GardenerCluster watcher");
        let timeout = self.timeout;

        let error_policy = |obj: Arc<GardenerCluster>, error: &ControllerError, ctx: Arc<Reconciler>| {
            error!(
                "Reconciliation error for GardenerCluster {}: {}",
                obj.metadata.name.as_deref().unwrap_or_default(),
                error
            );
            Action::requeue(ctx.error_requeue_after)
        };

        let reconcile = move |obj: Arc<GardenerCluster>, ctx: Arc<Reconciler>| async move {
            let name = obj.metadata.name.clone().unwrap_or_default();
            debug!("Reconciling GardenerCluster {}", name);
            match tokio::time::timeout(timeout, ctx.reconcile_gardener_cluster(&obj)).await {
                Ok(result) => result,
                Err(_) => Err(ControllerError::Timeout(format!("GardenerCluster {name} after {timeout:?}"))),
            }
        };

        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(1))
            .concurrency(self.concurrency);

        Controller::new(self.api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                if let Err(e) = res {
                    error!("Controller error for GardenerCluster: {}", e);
                }
            })
            .await;

        Ok(())
    }
}
