//! GardenerCluster reconciler
//!
//! Keeps one secret per GardenerCluster filled with a fresh admin kubeconfig
//! of the referenced Shoot. The secret is found by its identity label, never
//! by name, so that a renamed target does not orphan the old secret.

use crate::error::ControllerError;
use crate::store::{ClusterStore, SecretStore};
use chrono::{DateTime, SecondsFormat, Utc};
use crds::{
    CLUSTER_NAME_LABEL, GardenerCluster, GardenerClusterStatus, KubeconfigReason, LAST_SYNC_ANNOTATION,
    MANAGED_BY_LABEL, MANAGED_BY_VALUE,
};
use gardener_client::GardenerClientTrait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_runtime::controller::Action;
use lifecycle_policy::{rotation_due, time_until_rotation};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// What one kubeconfig sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do yet; look again after the given delay
    None(Duration),
    Created,
    Modified,
    /// Existing kubeconfig was stripped on request; a new one must follow
    Rotated,
}

pub struct Reconciler {
    pub(crate) gardener_client: Box<dyn GardenerClientTrait>,
    pub(crate) secrets: Box<dyn SecretStore>,
    pub(crate) clusters: Box<dyn ClusterStore>,
    pub(crate) rotation_period: Duration,
    pub(crate) kubeconfig_expiration: Duration,
    pub(crate) error_requeue_after: Duration,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("rotation_period", &self.rotation_period)
            .field("kubeconfig_expiration", &self.kubeconfig_expiration)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        gardener_client: Box<dyn GardenerClientTrait>,
        secrets: Box<dyn SecretStore>,
        clusters: Box<dyn ClusterStore>,
        rotation_period: Duration,
        kubeconfig_expiration: Duration,
        error_requeue_after: Duration,
    ) -> Self {
        Self {
            gardener_client,
            secrets,
            clusters,
            rotation_period,
            kubeconfig_expiration,
            error_requeue_after,
        }
    }

    /// Reconciles a GardenerCluster.
    #[instrument(skip_all, fields(cluster = cluster.metadata.name.as_deref().unwrap_or_default()))]
    pub async fn reconcile_gardener_cluster(&self, cluster: &GardenerCluster) -> Result<Action, ControllerError> {
        let name = cluster
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::InvalidConfig("GardenerCluster missing name".to_string()))?;
        let namespace = cluster.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling GardenerCluster {}/{}", namespace, name);

        if cluster.metadata.deletion_timestamp.is_some() {
            if cluster.has_finalizer() {
                // errors keep the finalizer and go back through the error policy
                self.cleanup_gardener_cluster(&cluster.spec.kubeconfig.secret.namespace, name)
                    .await?;
                self.clusters.remove_finalizer(cluster).await?;
                info!("Released GardenerCluster {}/{}", namespace, name);
            }
            return Ok(Action::await_change());
        }

        if !cluster.has_finalizer() {
            self.clusters.add_finalizer(cluster).await?;
            debug!("Added finalizer to GardenerCluster {}/{}", namespace, name);
        }

        let mut forced = cluster.rotation_forced();
        loop {
            let outcome = match self.sync_kubeconfig(cluster, forced).await {
                Ok(outcome) => outcome,
                Err(SyncError { reason, error, retry }) => {
                    self.record_error(cluster, reason, &error).await;
                    return if retry { Err(error) } else { Ok(Action::await_change()) };
                }
            };
            debug!("GardenerCluster {}/{} sync outcome: {:?}", namespace, name, outcome);

            match outcome {
                Outcome::Rotated => {
                    info!("Forced rotation of kubeconfig for GardenerCluster {}/{}", namespace, name);
                    self.clusters.remove_force_annotation(cluster).await?;
                    forced = false;
                }
                Outcome::None(next_check) => return Ok(Action::requeue(next_check)),
                Outcome::Created | Outcome::Modified => {
                    let (reason, message) = if outcome == Outcome::Created {
                        (KubeconfigReason::KubeconfigSecretCreated, "Secret created successfully")
                    } else {
                        (KubeconfigReason::KubeconfigSecretRotated, "Secret rotated successfully")
                    };
                    let mut status = cluster.status.clone().unwrap_or_default();
                    status.set_ready(reason, message);
                    self.persist_status(cluster, &status).await;
                    return Ok(Action::requeue(self.next_check(Some(&now_rfc3339()), Utc::now())));
                }
            }
        }
    }

    /// Deletes the kubeconfig secret of a GardenerCluster being deleted.
    ///
    /// More than one labelled secret is an error and nothing is deleted.
    pub async fn cleanup_gardener_cluster(&self, secret_namespace: &str, cluster_name: &str) -> Result<(), ControllerError> {
        match self.find_secret(secret_namespace, cluster_name).await? {
            None => {
                debug!("No kubeconfig secret left for GardenerCluster {}", cluster_name);
                Ok(())
            }
            Some(secret) => {
                self.secrets.delete(&secret).await.inspect_err(|e| {
                    error!("Failed to delete kubeconfig secret of GardenerCluster {}: {}", cluster_name, e);
                })?;
                info!(
                    "Deleted kubeconfig secret {} of GardenerCluster {}",
                    secret.metadata.name.as_deref().unwrap_or_default(),
                    cluster_name
                );
                Ok(())
            }
        }
    }

    async fn sync_kubeconfig(&self, cluster: &GardenerCluster, forced: bool) -> Result<Outcome, SyncError> {
        let cluster_name = cluster.metadata.name.as_deref().unwrap_or_default();
        let target = &cluster.spec.kubeconfig.secret;

        let existing = self
            .find_secret(&target.namespace, cluster_name)
            .await
            .map_err(|error| SyncError::retry(KubeconfigReason::FailedToGetSecret, error))?;

        let kubeconfig = match self
            .gardener_client
            .request_admin_kubeconfig(&cluster.spec.shoot.name, self.kubeconfig_expiration)
            .await
        {
            Ok(kubeconfig) => kubeconfig,
            Err(e) if e.is_not_found() => {
                warn!("Shoot {} not found, cannot issue kubeconfig", cluster.spec.shoot.name);
                return Err(SyncError {
                    reason: KubeconfigReason::FailedToGetKubeconfig,
                    error: e.into(),
                    retry: false,
                });
            }
            Err(e) => return Err(SyncError::retry(KubeconfigReason::FailedToGetKubeconfig, e.into())),
        };

        if forced {
            if let Some(mut secret) = existing {
                strip_kubeconfig(&mut secret, &target.key);
                self.secrets
                    .update(&secret)
                    .await
                    .map_err(|error| SyncError::retry(KubeconfigReason::FailedToUpdateSecret, error))?;
            }
            return Ok(Outcome::Rotated);
        }

        let now = Utc::now();
        let last_sync = existing.as_ref().and_then(last_sync);
        if !rotation_due(last_sync.as_deref(), self.rotation_period, false, now) {
            return Ok(Outcome::None(self.next_check(last_sync.as_deref(), now)));
        }

        let synced_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        match existing {
            Some(mut secret) => {
                write_kubeconfig(&mut secret, &target.key, &kubeconfig, &synced_at);
                self.secrets
                    .update(&secret)
                    .await
                    .map_err(|error| SyncError::retry(KubeconfigReason::FailedToUpdateSecret, error))?;
                info!("Rotated kubeconfig secret {}/{}", target.namespace, target.name);
                Ok(Outcome::Modified)
            }
            None => {
                let mut secret = new_secret(cluster);
                write_kubeconfig(&mut secret, &target.key, &kubeconfig, &synced_at);
                self.secrets
                    .create(&secret)
                    .await
                    .map_err(|error| SyncError::retry(KubeconfigReason::FailedToCreateSecret, error))?;
                info!("Created kubeconfig secret {}/{}", target.namespace, target.name);
                Ok(Outcome::Created)
            }
        }
    }

    /// The secret carrying the cluster's identity label, if exactly one does.
    async fn find_secret(&self, namespace: &str, cluster_name: &str) -> Result<Option<Secret>, ControllerError> {
        let selector = format!("{CLUSTER_NAME_LABEL}={cluster_name}");
        let mut secrets = self.secrets.list(namespace, &selector).await?;
        match secrets.len() {
            0 => Ok(None),
            1 => Ok(secrets.pop()),
            n => Err(ControllerError::AmbiguousSecret(format!(
                "{n} secrets in {namespace} match {selector}"
            ))),
        }
    }

    fn next_check(&self, last_sync: Option<&str>, now: DateTime<Utc>) -> Duration {
        time_until_rotation(last_sync, self.rotation_period, now).max(Duration::from_secs(1))
    }

    async fn record_error(&self, cluster: &GardenerCluster, reason: KubeconfigReason, error: &ControllerError) {
        error!(
            "Kubeconfig sync failed for GardenerCluster {}: {}",
            cluster.metadata.name.as_deref().unwrap_or_default(),
            error
        );
        let mut status = cluster.status.clone().unwrap_or_default();
        status.set_error(reason, error.to_string());
        self.persist_status(cluster, &status).await;
    }

    async fn persist_status(&self, cluster: &GardenerCluster, status: &GardenerClusterStatus) {
        if cluster.status.as_ref() == Some(status) {
            return;
        }
        if let Err(e) = self.clusters.update_status(cluster, status).await {
            error!(
                "Failed to update status of GardenerCluster {}: {}",
                cluster.metadata.name.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}

struct SyncError {
    reason: KubeconfigReason,
    error: ControllerError,
    /// Whether the watcher should retry the invocation
    retry: bool,
}

impl SyncError {
    fn retry(reason: KubeconfigReason, error: ControllerError) -> Self {
        Self {
            reason,
            error,
            retry: true,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn last_sync(secret: &Secret) -> Option<String> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(LAST_SYNC_ANNOTATION))
        .cloned()
}

/// Empty secret for `cluster` carrying its labels plus the ownership labels.
fn new_secret(cluster: &GardenerCluster) -> Secret {
    let target = &cluster.spec.kubeconfig.secret;
    let mut labels = cluster.metadata.labels.clone().unwrap_or_default();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(
        CLUSTER_NAME_LABEL.to_string(),
        cluster.metadata.name.clone().unwrap_or_default(),
    );

    Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn write_kubeconfig(secret: &mut Secret, key: &str, kubeconfig: &str, synced_at: &str) {
    secret
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), ByteString(kubeconfig.as_bytes().to_vec()));
    secret
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LAST_SYNC_ANNOTATION.to_string(), synced_at.to_string());
}

fn strip_kubeconfig(secret: &mut Secret, key: &str) {
    if let Some(data) = secret.data.as_mut() {
        data.remove(key);
    }
    if let Some(annotations) = secret.metadata.annotations.as_mut() {
        annotations.remove(LAST_SYNC_ANNOTATION);
    }
}
