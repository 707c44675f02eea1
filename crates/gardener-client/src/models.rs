//! Gardener API models
//!
//! Only the parts of `core.gardener.cloud/v1beta1` Shoot and Seed that the
//! controllers read or write. Maps are `BTreeMap` and optional fields are
//! skipped when empty so that serialization is stable.
//!
//! Shoots are written back with a full update, so every Shoot spec struct
//! that is read from the server keeps the fields it does not model in
//! `extra` and serializes them again unchanged.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Annotation recording the Runtime generation a Shoot was last built from.
pub const RUNTIME_GENERATION_ANNOTATION: &str = "infrastructuremanager.kyma-project.io/runtime-generation";

/// Annotation Gardener requires before it accepts a Shoot deletion.
pub const DELETION_CONFIRMATION_ANNOTATION: &str = "confirmation.gardener.cloud/deletion";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Shoot",
    namespaced,
    status = "ShootStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile_name: Option<String>,

    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_binding_name: Option<String>,

    #[serde(default)]
    pub kubernetes: ShootKubernetes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<ShootNetworking>,

    #[serde(default)]
    pub provider: ShootProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ShootControlPlane>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<NamedResourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_class_name: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootKubernetes {
    #[serde(default)]
    pub version: String,

    #[serde(rename = "kubeAPIServer", default, skip_serializing_if = "Option::is_none")]
    pub kube_api_server: Option<KubeApiServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_static_token_kubeconfig: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeApiServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<ShootOidcConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_config: Option<AuditConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootOidcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,

    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,

    #[serde(rename = "issuerURL", default, skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_algs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_policy: Option<AuditPolicy>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<LocalObjectReference>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootNetworking {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootProvider {
    #[serde(rename = "type", default)]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_config: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_config: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<ShootWorker>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootWorker {
    pub name: String,

    pub machine: ShootMachine,

    pub minimum: i32,

    pub maximum: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<ShootVolume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootMachine {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ShootMachineImage>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootMachineImage {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootVolume {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    pub volume_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootControlPlane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<ShootHighAvailability>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootHighAvailability {
    pub failure_tolerance: ShootFailureTolerance,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootFailureTolerance {
    #[serde(rename = "type")]
    pub type_: String,
}

/// Shoot extension, identified by its `type`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Named reference to an object in the Shoot's project namespace.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamedResourceReference {
    pub name: String,

    pub resource_ref: CrossVersionObjectReference,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    pub kind: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<MaintenanceTimeWindow>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Daily maintenance window, e.g. `begin: "220000+0000"`, `end: "230000+0000"`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTimeWindow {
    pub begin: String,

    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub type_: LastOperationType,

    pub state: LastOperationState,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub progress: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LastOperationType {
    Create,
    Reconcile,
    Delete,
    Migrate,
    Restore,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LastOperationState {
    Pending,
    Processing,
    Succeeded,
    Error,
    Failed,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl Shoot {
    /// Last operation reported by Gardener, if any.
    pub fn last_operation(&self) -> Option<&LastOperation> {
        self.status.as_ref().and_then(|s| s.last_operation.as_ref())
    }

    /// Runtime generation recorded when the Shoot was last built.
    pub fn runtime_generation(&self) -> Option<i64> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(RUNTIME_GENERATION_ANNOTATION))
            .and_then(|v| v.parse().ok())
    }

    /// Extension of the given type, if present.
    pub fn extension(&self, type_: &str) -> Option<&Extension> {
        self.spec.extensions.iter().find(|e| e.type_ == type_)
    }

    /// Whether Gardener already accepted a deletion.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Seed",
    status = "SeedStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    #[serde(default)]
    pub provider: SeedProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SeedSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedProvider {
    #[serde(rename = "type", default)]
    pub type_: String,

    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SeedScheduling>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedScheduling {
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    #[serde(default)]
    pub conditions: Vec<GardenerCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GardenerCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,
}

/// Seed conditions that must be `True` for a seed to accept Shoots.
pub const SEED_READY_CONDITIONS: [&str; 2] = ["GardenletReady", "SeedSystemComponentsHealthy"];

impl Seed {
    /// Whether the seed can take new Shoots: not being deleted, visible to
    /// the scheduler and reporting every readiness condition as `True`.
    pub fn is_usable(&self) -> bool {
        if self.metadata.deletion_timestamp.is_some() {
            return false;
        }

        let visible = self
            .spec
            .settings
            .as_ref()
            .and_then(|s| s.scheduling.as_ref())
            .is_none_or(|s| s.visible);
        if !visible {
            return false;
        }

        let conditions = self.status.as_ref().map(|s| s.conditions.as_slice()).unwrap_or_default();
        SEED_READY_CONDITIONS.iter().all(|wanted| {
            conditions
                .iter()
                .any(|c| c.type_ == *wanted && c.status == "True")
        })
    }
}

/// `authentication.gardener.cloud/v1alpha1` AdminKubeconfigRequest body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminKubeconfigRequest {
    pub api_version: String,

    pub kind: String,

    pub spec: AdminKubeconfigRequestSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdminKubeconfigRequestStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminKubeconfigRequestSpec {
    pub expiration_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminKubeconfigRequestStatus {
    /// Base64-encoded kubeconfig
    #[serde(default)]
    pub kubeconfig: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<String>,
}

impl AdminKubeconfigRequest {
    /// Builds a request for a kubeconfig valid for `expiration_seconds`.
    pub fn new(expiration_seconds: i64) -> Self {
        Self {
            api_version: "authentication.gardener.cloud/v1alpha1".to_string(),
            kind: "AdminKubeconfigRequest".to_string(),
            spec: AdminKubeconfigRequestSpec { expiration_seconds },
            status: None,
        }
    }
}

/// Helper for building annotation maps.
pub fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
