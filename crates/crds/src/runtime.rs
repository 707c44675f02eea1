//! Runtime CRD
//!
//! Declares the desired state of a managed Kubernetes cluster. The runtime
//! controller turns every Runtime into exactly one Gardener Shoot and reports
//! progress through `status.state` and `status.conditions`.

use crate::conditions::{Condition, ConditionStatus, find_condition, upsert_condition};
use crate::error::CrdError;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer guarding Shoot deletion.
pub const RUNTIME_FINALIZER: &str =
    "runtime-controller.infrastructure-manager.kyma-project.io/deletion-hook";

/// Purpose value that enables maintenance windows.
pub const PURPOSE_PRODUCTION: &str = "production";

pub const LABEL_INSTANCE_ID: &str = "kyma-project.io/instance-id";
pub const LABEL_RUNTIME_ID: &str = "kyma-project.io/runtime-id";
pub const LABEL_BROKER_PLAN_ID: &str = "kyma-project.io/broker-plan-id";
pub const LABEL_BROKER_PLAN_NAME: &str = "kyma-project.io/broker-plan-name";
pub const LABEL_GLOBAL_ACCOUNT_ID: &str = "kyma-project.io/global-account-id";
pub const LABEL_SUBACCOUNT_ID: &str = "kyma-project.io/subaccount-id";
pub const LABEL_SHOOT_NAME: &str = "kyma-project.io/shoot-name";
pub const LABEL_REGION: &str = "kyma-project.io/region";
pub const LABEL_KYMA_NAME: &str = "operator.kyma-project.io/kyma-name";

/// Labels every Runtime must carry before a Shoot is built for it.
pub const REQUIRED_LABELS: [&str; 9] = [
    LABEL_INSTANCE_ID,
    LABEL_RUNTIME_ID,
    LABEL_BROKER_PLAN_ID,
    LABEL_BROKER_PLAN_NAME,
    LABEL_GLOBAL_ACCOUNT_ID,
    LABEL_SUBACCOUNT_ID,
    LABEL_SHOOT_NAME,
    LABEL_REGION,
    LABEL_KYMA_NAME,
];

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "infrastructuremanager.kyma-project.io",
    version = "v1",
    kind = "Runtime",
    namespaced,
    status = "RuntimeStatus",
    shortname = "rt",
    printcolumn = r#"{"name":"Shoot","type":"string","jsonPath":".spec.shoot.name"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    /// Shoot cluster definition
    pub shoot: RuntimeShoot,

    /// Access and network security settings
    #[serde(default)]
    pub security: Security,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeShoot {
    /// Shoot name (unique within the Gardener project)
    pub name: String,

    /// Cluster purpose ("evaluation", "development", "production", ...)
    #[serde(default)]
    pub purpose: String,

    /// Provider region
    pub region: String,

    /// Licence type, copied into a Shoot annotation when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licence_type: Option<String>,

    /// Name of the Gardener secret binding holding cloud credentials
    pub secret_binding_name: String,

    /// Refuse to create the Shoot when no seed exists in the region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_seed_location: Option<bool>,

    /// Kubernetes settings
    #[serde(default)]
    pub kubernetes: Kubernetes,

    /// Infrastructure provider settings
    pub provider: Provider,

    /// Cluster networking CIDRs
    pub networking: Networking,

    /// Control plane settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlane>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kubernetes {
    /// Kubernetes version; the converter default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// API server settings
    #[serde(default)]
    pub kube_api_server: ApiServer,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiServer {
    /// OIDC authentication settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<OidcConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig {
    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(rename = "issuerURL", default, skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_algs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Provider type ("aws", "azure", "gcp", "openstack")
    #[serde(rename = "type")]
    pub type_: String,

    /// Worker pools
    #[serde(default)]
    pub workers: Vec<Worker>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub name: String,

    pub machine: Machine,

    pub minimum: i32,

    pub maximum: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,

    #[serde(default)]
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MachineImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    pub volume_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Network plugin type (defaults to "calico")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    pub pods: String,

    pub nodes: String,

    pub services: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<HighAvailability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighAvailability {
    pub failure_tolerance: FailureTolerance,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureTolerance {
    /// "node" or "zone"
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    /// Cluster administrators
    #[serde(default)]
    pub administrators: Vec<String>,

    #[serde(default)]
    pub networking: NetworkingSecurity,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingSecurity {
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<FilterToggle>,

    /// Egress filter; the converter default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress: Option<FilterToggle>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterToggle {
    #[serde(default)]
    pub enabled: bool,
}

/// Overall Runtime state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum RuntimeState {
    /// Shoot is being provisioned or updated
    #[default]
    #[serde(alias = "pending")]
    Pending,

    /// Shoot is provisioned and fully configured
    #[serde(alias = "ready")]
    Ready,

    /// Terminal failure; needs a Runtime change
    #[serde(alias = "failed")]
    Failed,

    /// Shoot is being deleted
    #[serde(alias = "terminating")]
    Terminating,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RuntimeState>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition types reported on a Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeConditionType {
    Provisioned,
    Deprovisioned,
    AuditLogConfigured,
}

impl RuntimeConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeConditionType::Provisioned => "Provisioned",
            RuntimeConditionType::Deprovisioned => "Deprovisioned",
            RuntimeConditionType::AuditLogConfigured => "AuditLogConfigured",
        }
    }
}

/// Condition reasons reported on a Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeConditionReason {
    ValidationError,
    ConversionError,
    SeedNotFound,
    AuditLogError,
    GardenerError,
    ShootCreationPending,
    ShootCreationFailed,
    ShootUpdatePending,
    ShootUpdateFailed,
    ShootDeletionPending,
    ShootDeletionFailed,
    ShootDeleted,
    AuditLogConfigured,
    Ready,
}

impl RuntimeConditionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeConditionReason::ValidationError => "ValidationError",
            RuntimeConditionReason::ConversionError => "ConversionError",
            RuntimeConditionReason::SeedNotFound => "SeedNotFound",
            RuntimeConditionReason::AuditLogError => "AuditLogError",
            RuntimeConditionReason::GardenerError => "GardenerError",
            RuntimeConditionReason::ShootCreationPending => "ShootCreationPending",
            RuntimeConditionReason::ShootCreationFailed => "ShootCreationFailed",
            RuntimeConditionReason::ShootUpdatePending => "ShootUpdatePending",
            RuntimeConditionReason::ShootUpdateFailed => "ShootUpdateFailed",
            RuntimeConditionReason::ShootDeletionPending => "ShootDeletionPending",
            RuntimeConditionReason::ShootDeletionFailed => "ShootDeletionFailed",
            RuntimeConditionReason::ShootDeleted => "ShootDeleted",
            RuntimeConditionReason::AuditLogConfigured => "AuditLogConfigured",
            RuntimeConditionReason::Ready => "Ready",
        }
    }
}

impl RuntimeStatus {
    /// Sets `state` and upserts the condition of the given type.
    pub fn update(
        &mut self,
        state: RuntimeState,
        type_: RuntimeConditionType,
        reason: RuntimeConditionReason,
        status: ConditionStatus,
        message: impl Into<String>,
        generation: Option<i64>,
    ) {
        self.state = Some(state);
        upsert_condition(
            &mut self.conditions,
            Condition::new(type_.as_str(), status, reason.as_str(), message).with_generation(generation),
        );
    }

    /// Whether the condition of `type_` already carries this status and
    /// reason for `generation`.
    pub fn reports(
        &self,
        type_: RuntimeConditionType,
        reason: RuntimeConditionReason,
        status: ConditionStatus,
        generation: Option<i64>,
    ) -> bool {
        find_condition(&self.conditions, type_.as_str()).is_some_and(|c| {
            c.status == status && c.reason == reason.as_str() && c.observed_generation == generation
        })
    }

    /// Upserts a condition without touching `state`.
    pub fn set_condition(
        &mut self,
        type_: RuntimeConditionType,
        reason: RuntimeConditionReason,
        status: ConditionStatus,
        message: impl Into<String>,
        generation: Option<i64>,
    ) {
        upsert_condition(
            &mut self.conditions,
            Condition::new(type_.as_str(), status, reason.as_str(), message).with_generation(generation),
        );
    }
}

impl Runtime {
    /// Checks that every label in [`REQUIRED_LABELS`] is present.
    pub fn validate_required_labels(&self) -> Result<(), CrdError> {
        let labels = self.metadata.labels.as_ref();
        let missing: Vec<String> = REQUIRED_LABELS
            .iter()
            .filter(|label| labels.is_none_or(|l| !l.contains_key(**label)))
            .map(|label| (*label).to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CrdError::MissingLabels(missing))
        }
    }

    /// Whether the Runtime carries the deletion finalizer.
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == RUNTIME_FINALIZER))
    }

    /// Whether the Runtime is marked for deletion.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
