//! Runtime persistence
//!
//! Status and finalizer writes go through [`RuntimeStore`] so the reconciler
//! can be exercised without an API server.

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{RUNTIME_FINALIZER, Runtime, RuntimeStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;

#[async_trait]
pub trait RuntimeStore: Send + Sync {
    async fn update_status(&self, runtime: &Runtime, status: &RuntimeStatus) -> Result<(), ControllerError>;

    async fn add_finalizer(&self, runtime: &Runtime) -> Result<(), ControllerError>;

    async fn remove_finalizer(&self, runtime: &Runtime) -> Result<(), ControllerError>;
}

/// [`RuntimeStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeRuntimeStore {
    client: Client,
}

impl std::fmt::Debug for KubeRuntimeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KubeRuntimeStore")
    }
}

impl KubeRuntimeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, runtime: &Runtime) -> Api<Runtime> {
        let namespace = runtime.metadata.namespace.as_deref().unwrap_or("default");
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn patch_finalizers(&self, runtime: &Runtime, finalizers: Vec<String>) -> Result<(), ControllerError> {
        let name = runtime.metadata.name.as_deref().unwrap_or_default();
        // resourceVersion makes the merge patch fail with 409 on a stale read
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": runtime.metadata.resource_version,
            }
        });
        self.api(runtime)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RuntimeStore for KubeRuntimeStore {
    async fn update_status(&self, runtime: &Runtime, status: &RuntimeStatus) -> Result<(), ControllerError> {
        let name = runtime.metadata.name.as_deref().unwrap_or_default();
        let patch = json!({ "status": status });
        self.api(runtime)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, runtime: &Runtime) -> Result<(), ControllerError> {
        let mut finalizers = runtime.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(RUNTIME_FINALIZER.to_string());
        self.patch_finalizers(runtime, finalizers).await
    }

    async fn remove_finalizer(&self, runtime: &Runtime) -> Result<(), ControllerError> {
        let finalizers = runtime
            .metadata
            .finalizers
            .iter()
            .flatten()
            .filter(|f| *f != RUNTIME_FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(runtime, finalizers).await
    }
}
