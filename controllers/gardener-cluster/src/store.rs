//! Secret and GardenerCluster persistence
//!
//! The reconciler only talks to [`SecretStore`] and [`ClusterStore`]; the
//! Kubernetes-backed implementations live here as well.

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{FORCE_ROTATION_ANNOTATION, GARDENER_CLUSTER_FINALIZER, GardenerCluster, GardenerClusterStatus};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;

/// Label-selected access to kubeconfig secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Secrets in `namespace` matching `label_selector` (`key=value`).
    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>, ControllerError>;

    async fn create(&self, secret: &Secret) -> Result<(), ControllerError>;

    /// Replaces the secret; a stale `resourceVersion` fails with a conflict.
    async fn update(&self, secret: &Secret) -> Result<(), ControllerError>;

    async fn delete(&self, secret: &Secret) -> Result<(), ControllerError>;
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn update_status(&self, cluster: &GardenerCluster, status: &GardenerClusterStatus)
    -> Result<(), ControllerError>;

    /// Drops the forced-rotation annotation from the GardenerCluster.
    async fn remove_force_annotation(&self, cluster: &GardenerCluster) -> Result<(), ControllerError>;

    async fn add_finalizer(&self, cluster: &GardenerCluster) -> Result<(), ControllerError>;

    async fn remove_finalizer(&self, cluster: &GardenerCluster) -> Result<(), ControllerError>;
}

#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KubeSecretStore")
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, secret: &Secret) -> Api<Secret> {
        let namespace = secret.metadata.namespace.as_deref().unwrap_or("default");
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secrets = api.list(&ListParams::default().labels(label_selector)).await?;
        Ok(secrets.items)
    }

    async fn create(&self, secret: &Secret) -> Result<(), ControllerError> {
        self.api(secret).create(&PostParams::default(), secret).await?;
        Ok(())
    }

    async fn update(&self, secret: &Secret) -> Result<(), ControllerError> {
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        self.api(secret).replace(name, &PostParams::default(), secret).await?;
        Ok(())
    }

    async fn delete(&self, secret: &Secret) -> Result<(), ControllerError> {
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        self.api(secret).delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl std::fmt::Debug for KubeClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KubeClusterStore")
    }
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, cluster: &GardenerCluster) -> Api<GardenerCluster> {
        let namespace = cluster.metadata.namespace.as_deref().unwrap_or("default");
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Writes the whole finalizer list, guarded by the observed resourceVersion.
    async fn patch_finalizers(&self, cluster: &GardenerCluster, finalizers: Vec<String>) -> Result<(), ControllerError> {
        let name = cluster.metadata.name.as_deref().unwrap_or_default();
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": cluster.metadata.resource_version,
            }
        });
        self.api(cluster)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn update_status(
        &self,
        cluster: &GardenerCluster,
        status: &GardenerClusterStatus,
    ) -> Result<(), ControllerError> {
        let name = cluster.metadata.name.as_deref().unwrap_or_default();
        let patch = json!({ "status": status });
        self.api(cluster)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn remove_force_annotation(&self, cluster: &GardenerCluster) -> Result<(), ControllerError> {
        let name = cluster.metadata.name.as_deref().unwrap_or_default();
        // null deletes the key in a merge patch
        let patch = json!({
            "metadata": {
                "annotations": { FORCE_ROTATION_ANNOTATION: null }
            }
        });
        self.api(cluster)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, cluster: &GardenerCluster) -> Result<(), ControllerError> {
        let mut finalizers = cluster.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(GARDENER_CLUSTER_FINALIZER.to_string());
        self.patch_finalizers(cluster, finalizers).await
    }

    async fn remove_finalizer(&self, cluster: &GardenerCluster) -> Result<(), ControllerError> {
        let finalizers = cluster
            .metadata
            .finalizers
            .iter()
            .flatten()
            .filter(|f| f.as_str() != GARDENER_CLUSTER_FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(cluster, finalizers).await
    }
}
