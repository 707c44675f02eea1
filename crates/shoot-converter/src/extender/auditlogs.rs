//! Audit log extension, credentials reference and policy ConfigMap.

use super::{Extender, upsert_extension, upsert_resource};
use crate::audit_log::AuditLogData;
use crate::error::ConverterError;
use crds::Runtime;
use gardener_client::{
    AuditConfig, AuditPolicy, CrossVersionObjectReference, Extension, KubeApiServerConfig, LocalObjectReference,
    NamedResourceReference, Shoot,
};
use serde::{Deserialize, Serialize};

pub const AUDITLOG_EXTENSION_TYPE: &str = "shoot-auditlog-service";
pub const AUDITLOG_REFERENCE_NAME: &str = "auditlog-credentials";

/// `providerConfig` of the auditlog extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditlogExtensionConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "tenantID")]
    pub tenant_id: String,

    #[serde(rename = "serviceURL")]
    pub service_url: String,

    #[serde(rename = "secretReferenceName")]
    pub secret_reference_name: String,
}

impl AuditlogExtensionConfig {
    pub fn new(data: &AuditLogData) -> Self {
        Self {
            api_version: "service.auditlog.extensions.gardener.cloud/v1alpha1".to_string(),
            kind: "AuditlogConfig".to_string(),
            type_: "standard".to_string(),
            tenant_id: data.tenant_id.clone(),
            service_url: data.service_url.clone(),
            secret_reference_name: AUDITLOG_REFERENCE_NAME.to_string(),
        }
    }
}

/// Upserts the extension and its secret reference when tenant data is known,
/// and points the API server at the audit policy ConfigMap.
pub fn extend_with_audit_log(policy_config_map_name: String, data: Option<AuditLogData>) -> Extender {
    Box::new(move |_runtime: &Runtime, shoot: &mut Shoot| -> Result<(), ConverterError> {
        if let Some(data) = &data {
            set_extension(shoot, data)?;
            set_secret_reference(shoot, &data.secret_name);
        }
        set_policy_config_map(shoot, &policy_config_map_name);
        Ok(())
    })
}

/// Whether the Shoot already reflects the given tenant and policy.
pub fn audit_log_configured(shoot: &Shoot, policy_config_map_name: &str, data: &AuditLogData) -> bool {
    let extension_matches = shoot
        .extension(AUDITLOG_EXTENSION_TYPE)
        .and_then(|e| e.provider_config.clone())
        .and_then(|config| serde_json::from_value::<AuditlogExtensionConfig>(config).ok())
        .is_some_and(|config| config == AuditlogExtensionConfig::new(data));

    let secret_matches = shoot.spec.resources.iter().any(|r| {
        r.name == AUDITLOG_REFERENCE_NAME && r.resource_ref.name == data.secret_name
    });

    let policy_matches = policy_config_map_name.is_empty()
        || shoot
            .spec
            .kubernetes
            .kube_api_server
            .as_ref()
            .and_then(|a| a.audit_config.as_ref())
            .and_then(|a| a.audit_policy.as_ref())
            .and_then(|p| p.config_map_ref.as_ref())
            .is_some_and(|r| r.name == policy_config_map_name);

    extension_matches && secret_matches && policy_matches
}

fn set_extension(shoot: &mut Shoot, data: &AuditLogData) -> Result<(), ConverterError> {
    let config = serde_json::to_value(AuditlogExtensionConfig::new(data))?;
    upsert_extension(
        &mut shoot.spec.extensions,
        Extension {
            type_: AUDITLOG_EXTENSION_TYPE.to_string(),
            provider_config: Some(config),
            disabled: None,
        },
    );
    Ok(())
}

fn set_secret_reference(shoot: &mut Shoot, secret_name: &str) {
    upsert_resource(
        &mut shoot.spec.resources,
        NamedResourceReference {
            name: AUDITLOG_REFERENCE_NAME.to_string(),
            resource_ref: CrossVersionObjectReference {
                kind: "Secret".to_string(),
                name: secret_name.to_string(),
                api_version: Some("v1".to_string()),
            },
        },
    );
}

fn set_policy_config_map(shoot: &mut Shoot, name: &str) {
    if name.is_empty() {
        return;
    }
    shoot
        .spec
        .kubernetes
        .kube_api_server
        .get_or_insert_with(KubeApiServerConfig::default)
        .audit_config
        .get_or_insert_with(AuditConfig::default)
        .audit_policy
        .get_or_insert_with(AuditPolicy::default)
        .config_map_ref = Some(LocalObjectReference { name: name.to_string() });
}
