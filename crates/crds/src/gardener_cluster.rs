//! GardenerCluster CRD
//!
//! Access object for a Shoot. The gardener-cluster controller keeps the
//! referenced secret filled with a fresh admin kubeconfig.

use crate::conditions::{Condition, ConditionStatus, upsert_condition};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// RFC3339 timestamp of the last kubeconfig write, set on the secret.
pub const LAST_SYNC_ANNOTATION: &str = "operator.kyma-project.io/last-sync";

/// Presence-only annotation requesting an immediate rotation.
pub const FORCE_ROTATION_ANNOTATION: &str = "operator.kyma-project.io/force-kubeconfig-rotation";

/// Identity label tying a secret to its GardenerCluster.
pub const CLUSTER_NAME_LABEL: &str = "operator.kyma-project.io/cluster-name";

pub const MANAGED_BY_LABEL: &str = "operator.kyma-project.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "infrastructure-manager";

/// Condition type reported by the gardener-cluster controller.
pub const CONDITION_KUBECONFIG_MANAGEMENT: &str = "KubeconfigManagement";

/// Held until the kubeconfig secret of a deleted GardenerCluster is gone.
pub const GARDENER_CLUSTER_FINALIZER: &str = "gardenercluster-controller.infrastructure-manager.kyma-project.io/deletion-hook";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "infrastructuremanager.kyma-project.io",
    version = "v1",
    kind = "GardenerCluster",
    namespaced,
    status = "GardenerClusterStatus",
    shortname = "gc",
    printcolumn = r#"{"name":"Shoot","type":"string","jsonPath":".spec.shoot.name"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GardenerClusterSpec {
    pub kubeconfig: KubeconfigTarget,

    pub shoot: ShootReference,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigTarget {
    pub secret: SecretTarget,
}

/// Where the kubeconfig is written.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretTarget {
    pub name: String,

    pub namespace: String,

    /// Data key holding the kubeconfig
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShootReference {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum GardenerClusterState {
    #[default]
    #[serde(alias = "pending")]
    Pending,

    #[serde(alias = "ready")]
    Ready,

    #[serde(alias = "error")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GardenerClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<GardenerClusterState>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Reasons for the `KubeconfigManagement` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KubeconfigReason {
    KubeconfigSecretCreated,
    KubeconfigSecretRotated,
    FailedToGetSecret,
    FailedToGetKubeconfig,
    FailedToDeleteSecret,
    FailedToCreateSecret,
    FailedToUpdateSecret,
}

impl KubeconfigReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            KubeconfigReason::KubeconfigSecretCreated => "KubeconfigSecretCreated",
            KubeconfigReason::KubeconfigSecretRotated => "KubeconfigSecretRotated",
            KubeconfigReason::FailedToGetSecret => "FailedToGetSecret",
            KubeconfigReason::FailedToGetKubeconfig => "FailedToGetKubeconfig",
            KubeconfigReason::FailedToDeleteSecret => "FailedToDeleteSecret",
            KubeconfigReason::FailedToCreateSecret => "FailedToCreateSecret",
            KubeconfigReason::FailedToUpdateSecret => "FailedToUpdateSecret",
        }
    }
}

impl GardenerClusterStatus {
    /// Marks the kubeconfig as successfully written.
    pub fn set_ready(&mut self, reason: KubeconfigReason, message: impl Into<String>) {
        self.state = Some(GardenerClusterState::Ready);
        upsert_condition(
            &mut self.conditions,
            Condition::new(CONDITION_KUBECONFIG_MANAGEMENT, ConditionStatus::True, reason.as_str(), message),
        );
    }

    /// Records a failure of the given kind.
    pub fn set_error(&mut self, reason: KubeconfigReason, message: impl Into<String>) {
        self.state = Some(GardenerClusterState::Error);
        upsert_condition(
            &mut self.conditions,
            Condition::new(CONDITION_KUBECONFIG_MANAGEMENT, ConditionStatus::False, reason.as_str(), message),
        );
    }
}

impl GardenerCluster {
    /// Whether a forced rotation was requested.
    pub fn rotation_forced(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(FORCE_ROTATION_ANNOTATION))
    }

    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == GARDENER_CLUSTER_FINALIZER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn forced_rotation_is_presence_only() {
        let mut cluster = GardenerCluster {
            metadata: ObjectMeta {
                name: Some("c1".to_string()),
                ..Default::default()
            },
            spec: GardenerClusterSpec::default(),
            status: None,
        };
        assert!(!cluster.rotation_forced());

        let mut annotations = BTreeMap::new();
        annotations.insert(FORCE_ROTATION_ANNOTATION.to_string(), String::new());
        cluster.metadata.annotations = Some(annotations);
        assert!(cluster.rotation_forced());
    }

    #[test]
    fn finalizer_detection() {
        let mut cluster = GardenerCluster {
            metadata: ObjectMeta {
                name: Some("c1".to_string()),
                finalizers: Some(vec!["other".to_string()]),
                ..Default::default()
            },
            spec: GardenerClusterSpec::default(),
            status: None,
        };
        assert!(!cluster.has_finalizer());

        cluster.metadata.finalizers = Some(vec!["other".to_string(), GARDENER_CLUSTER_FINALIZER.to_string()]);
        assert!(cluster.has_finalizer());
    }

    #[test]
    fn error_then_ready_replaces_condition() {
        let mut status = GardenerClusterStatus::default();
        status.set_error(KubeconfigReason::FailedToGetKubeconfig, "gardener unavailable");
        status.set_ready(KubeconfigReason::KubeconfigSecretCreated, "created");

        assert_eq!(status.state, Some(GardenerClusterState::Ready));
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, ConditionStatus::True);
        assert_eq!(status.conditions[0].reason, "KubeconfigSecretCreated");
    }

    #[test]
    fn spec_roundtrips_camel_case() {
        let json = serde_json::json!({
            "kubeconfig": {"secret": {"name": "kubeconfig-rt-1", "namespace": "kcp-system", "key": "config"}},
            "shoot": {"name": "c-12345"}
        });
        let spec: GardenerClusterSpec = serde_json::from_value(json).unwrap();
        assert_eq!(spec.kubeconfig.secret.key, "config");
        assert_eq!(spec.shoot.name, "c-12345");
    }
}
