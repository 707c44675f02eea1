//! Gardener API client
//!
//! Talks to the Gardener virtual garden through a regular kube client built
//! from a dedicated kubeconfig. Shoots are namespaced to the project
//! namespace; seeds are cluster scoped.

use crate::error::GardenerError;
use crate::gardener_trait::GardenerClientTrait;
use crate::models::{AdminKubeconfigRequest, Seed, Shoot};
use base64::Engine;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Builds the Gardener project namespace for a project name.
pub fn project_namespace(project: &str) -> String {
    format!("garden-{project}")
}

/// Gardener client backed by the Kubernetes API machinery.
#[derive(Clone)]
pub struct GardenerClient {
    shoots: Api<Shoot>,
    seeds: Api<Seed>,
    namespace: String,
}

impl std::fmt::Debug for GardenerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GardenerClient")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl GardenerClient {
    /// Create a client from an existing kube client.
    pub fn new(client: Client, project: &str) -> Self {
        let namespace = project_namespace(project);
        Self {
            shoots: Api::namespaced(client.clone(), &namespace),
            seeds: Api::all(client),
            namespace,
        }
    }

    /// Create a client from a Gardener kubeconfig file.
    pub async fn from_kubeconfig(path: &str, project: &str) -> Result<Self, GardenerError> {
        info!("Loading Gardener kubeconfig from {}", path);
        let kubeconfig = Kubeconfig::read_from(path)
            .map_err(|e| GardenerError::InvalidConfig(format!("cannot read kubeconfig {path}: {e}")))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| GardenerError::InvalidConfig(format!("invalid kubeconfig {path}: {e}")))?;
        let client = Client::try_from(config).map_err(GardenerError::Kube)?;
        Ok(Self::new(client, project))
    }
}

#[async_trait::async_trait]
impl GardenerClientTrait for GardenerClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_shoot(&self, name: &str) -> Result<Shoot, GardenerError> {
        debug!("Fetching Shoot {}/{}", self.namespace, name);
        Ok(self.shoots.get(name).await?)
    }

    async fn create_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError> {
        Ok(self.shoots.create(&PostParams::default(), shoot).await?)
    }

    // Full replace guarded by resourceVersion. Fields the models do not know
    // travel through their `extra` maps.
    async fn update_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError> {
        let name = shoot
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| GardenerError::Api("Shoot without name".to_string()))?;
        Ok(self.shoots.replace(name, &PostParams::default(), shoot).await?)
    }

    async fn annotate_shoot(&self, name: &str, key: &str, value: &str) -> Result<(), GardenerError> {
        let patch = json!({"metadata": {"annotations": {key: value}}});
        self.shoots
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete_shoot(&self, name: &str) -> Result<(), GardenerError> {
        self.shoots.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn list_seeds(&self) -> Result<Vec<Seed>, GardenerError> {
        Ok(self.seeds.list(&ListParams::default()).await?.items)
    }

    async fn request_admin_kubeconfig(&self, shoot_name: &str, expiration: Duration) -> Result<String, GardenerError> {
        let expiration_seconds = i64::try_from(expiration.as_secs())
            .map_err(|e| GardenerError::InvalidConfig(format!("expiration {expiration:?} out of range: {e}")))?;
        let body = serde_json::to_vec(&AdminKubeconfigRequest::new(expiration_seconds))?;

        let response: AdminKubeconfigRequest = self
            .shoots
            .create_subresource("adminkubeconfig", shoot_name, &PostParams::default(), body)
            .await?;

        let encoded = response
            .status
            .map(|s| s.kubeconfig)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GardenerError::Api(format!("empty kubeconfig returned for Shoot {shoot_name}")))?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| GardenerError::Api(format!("kubeconfig for Shoot {shoot_name} is not base64: {e}")))?;
        String::from_utf8(decoded)
            .map_err(|e| GardenerError::Api(format!("kubeconfig for Shoot {shoot_name} is not UTF-8: {e}")))
    }
}
