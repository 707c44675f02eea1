//! Test utilities for unit testing the GardenerCluster reconciler

#[cfg(test)]
use crate::error::ControllerError;
#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use crate::store::{ClusterStore, SecretStore};
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use crds::{
    CLUSTER_NAME_LABEL, FORCE_ROTATION_ANNOTATION, GARDENER_CLUSTER_FINALIZER, GardenerCluster, GardenerClusterStatus,
    LAST_SYNC_ANNOTATION,
};
#[cfg(test)]
use gardener_client::MockGardenerClient;
#[cfg(test)]
use k8s_openapi::api::core::v1::Secret;
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
pub const ROTATION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[cfg(test)]
pub const TEST_KUBECONFIG: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

/// Helper to create a GardenerCluster targeting `kubeconfig-<name>` in kcp-system
#[cfg(test)]
pub fn create_test_gardener_cluster(name: &str, shoot: &str) -> GardenerCluster {
    serde_json::from_value(json!({
        "apiVersion": "infrastructuremanager.kyma-project.io/v1",
        "kind": "GardenerCluster",
        "metadata": {
            "name": name,
            "namespace": "kcp-system",
            "labels": {"kyma-project.io/runtime-id": name},
            "finalizers": [GARDENER_CLUSTER_FINALIZER]
        },
        "spec": {
            "kubeconfig": {
                "secret": {"name": format!("kubeconfig-{name}"), "namespace": "kcp-system", "key": "config"}
            },
            "shoot": {"name": shoot}
        }
    }))
    .unwrap()
}

/// Helper to create a kubeconfig secret labelled for `cluster_name`
#[cfg(test)]
pub fn create_test_secret(name: &str, cluster_name: &str, last_sync: Option<&str>) -> Secret {
    let mut annotations = BTreeMap::new();
    if let Some(last_sync) = last_sync {
        annotations.insert(LAST_SYNC_ANNOTATION.to_string(), last_sync.to_string());
    }
    let mut data = BTreeMap::new();
    data.insert("config".to_string(), k8s_openapi::ByteString(b"old-kubeconfig".to_vec()));

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("kcp-system".to_string()),
            labels: Some(BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), cluster_name.to_string())])),
            annotations: Some(annotations),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Marks the cluster as being deleted
#[cfg(test)]
pub fn mark_deleted(cluster: &mut GardenerCluster) {
    cluster.metadata.deletion_timestamp = Some(gardener_client::now_timestamp().unwrap());
}

#[cfg(test)]
pub fn force_rotation(cluster: &mut GardenerCluster) {
    cluster
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(FORCE_ROTATION_ANNOTATION.to_string(), "true".to_string());
}

/// Secrets kept in memory, with every write recorded
#[cfg(test)]
#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    pub secrets: Arc<Mutex<Vec<Secret>>>,
    pub writes: Arc<Mutex<Vec<(String, Secret)>>>,
    /// Number of upcoming deletes that fail
    pub failing_deletes: Arc<Mutex<usize>>,
}

#[cfg(test)]
impl InMemorySecretStore {
    pub fn add(&self, secret: Secret) {
        self.secrets.lock().unwrap().push(secret);
    }

    pub fn get(&self, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.metadata.name.as_deref() == Some(name))
            .cloned()
    }

    /// Writes as `"<op> <name>"`, oldest first
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(op, s)| format!("{op} {}", s.metadata.name.as_deref().unwrap_or_default()))
            .collect()
    }

    /// Secret as passed to the `index`-th write
    pub fn written(&self, index: usize) -> Secret {
        self.writes.lock().unwrap()[index].1.clone()
    }

    pub fn fail_deletes(&self, count: usize) {
        *self.failing_deletes.lock().unwrap() = count;
    }

    fn record(&self, op: &str, secret: &Secret) {
        self.writes.lock().unwrap().push((op.to_string(), secret.clone()));
    }
}

#[cfg(test)]
#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn list(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>, ControllerError> {
        let (key, value) = label_selector.split_once('=').unwrap();
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.metadata.namespace.as_deref() == Some(namespace))
            .filter(|s| {
                s.metadata
                    .labels
                    .as_ref()
                    .is_some_and(|l| l.get(key).map(String::as_str) == Some(value))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, secret: &Secret) -> Result<(), ControllerError> {
        self.record("create", secret);
        self.secrets.lock().unwrap().push(secret.clone());
        Ok(())
    }

    async fn update(&self, secret: &Secret) -> Result<(), ControllerError> {
        self.record("update", secret);
        let mut secrets = self.secrets.lock().unwrap();
        if let Some(existing) = secrets.iter_mut().find(|s| s.metadata.name == secret.metadata.name) {
            *existing = secret.clone();
        }
        Ok(())
    }

    async fn delete(&self, secret: &Secret) -> Result<(), ControllerError> {
        {
            let mut failing = self.failing_deletes.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ControllerError::Watch("secret delete rejected".to_string()));
            }
        }
        self.record("delete", secret);
        self.secrets
            .lock()
            .unwrap()
            .retain(|s| s.metadata.name != secret.metadata.name);
        Ok(())
    }
}

/// Records GardenerCluster status writes, annotation and finalizer changes
#[cfg(test)]
#[derive(Clone, Default)]
pub struct InMemoryClusterStore {
    pub statuses: Arc<Mutex<Vec<GardenerClusterStatus>>>,
    pub force_annotation_removals: Arc<Mutex<usize>>,
    pub finalizers_added: Arc<Mutex<usize>>,
    pub finalizers_removed: Arc<Mutex<usize>>,
}

#[cfg(test)]
impl InMemoryClusterStore {
    pub fn last_status(&self) -> Option<GardenerClusterStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn removals(&self) -> usize {
        *self.force_annotation_removals.lock().unwrap()
    }

    pub fn finalizers_added(&self) -> usize {
        *self.finalizers_added.lock().unwrap()
    }

    pub fn finalizers_removed(&self) -> usize {
        *self.finalizers_removed.lock().unwrap()
    }
}

#[cfg(test)]
#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn update_status(
        &self,
        _cluster: &GardenerCluster,
        status: &GardenerClusterStatus,
    ) -> Result<(), ControllerError> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }

    async fn remove_force_annotation(&self, _cluster: &GardenerCluster) -> Result<(), ControllerError> {
        *self.force_annotation_removals.lock().unwrap() += 1;
        Ok(())
    }

    async fn add_finalizer(&self, _cluster: &GardenerCluster) -> Result<(), ControllerError> {
        *self.finalizers_added.lock().unwrap() += 1;
        Ok(())
    }

    async fn remove_finalizer(&self, _cluster: &GardenerCluster) -> Result<(), ControllerError> {
        *self.finalizers_removed.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
pub struct TestHarness {
    pub gardener: MockGardenerClient,
    pub secrets: InMemorySecretStore,
    pub clusters: InMemoryClusterStore,
    pub reconciler: Reconciler,
}

/// Helper to create a reconciler backed by in-memory stores
#[cfg(test)]
pub fn create_test_reconciler() -> TestHarness {
    let gardener = MockGardenerClient::new("garden-kyma");
    let secrets = InMemorySecretStore::default();
    let clusters = InMemoryClusterStore::default();

    let reconciler = Reconciler::new(
        Box::new(gardener.clone()),
        Box::new(secrets.clone()),
        Box::new(clusters.clone()),
        ROTATION_PERIOD,
        ROTATION_PERIOD,
        Duration::from_secs(60),
    );

    TestHarness {
        gardener,
        secrets,
        clusters,
        reconciler,
    }
}
