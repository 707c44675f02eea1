//! Main controller implementation.

use crate::config::GardenerClusterControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::{KubeClusterStore, KubeSecretStore};
use crate::watcher::Watcher;
use crds::GardenerCluster;
use gardener_client::GardenerClient;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for GardenerCluster resources.
pub struct Controller {
    cluster_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Controller")
    }
}

impl Controller {
    pub async fn new(config: GardenerClusterControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing GardenerCluster Controller");

        let kube_client = Client::try_default().await?;
        let gardener_client =
            GardenerClient::from_kubeconfig(&config.gardener_kubeconfig_path, &config.gardener_project_name).await?;

        let reconciler = Arc::new(Reconciler::new(
            Box::new(gardener_client),
            Box::new(KubeSecretStore::new(kube_client.clone())),
            Box::new(KubeClusterStore::new(kube_client.clone())),
            config.rotation_period,
            config.kubeconfig_expiration,
            config.error_requeue_after,
        ));

        let api: Api<GardenerCluster> = Api::namespaced(kube_client, &config.watch_namespace);
        let watcher = Watcher::new(reconciler, api, config.concurrency, config.reconcile_timeout);
        let cluster_watcher = tokio::spawn(async move { watcher.watch_gardener_clusters().await });

        Ok(Self { cluster_watcher })
    }

    pub async fn run(self) -> Result<(), ControllerError> {
        info!("GardenerCluster Controller running");

        self.cluster_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("GardenerCluster watcher panicked: {e}")))?
            .map_err(|e| ControllerError::Watch(format!("GardenerCluster watcher error: {e}")))?;

        Ok(())
    }
}
