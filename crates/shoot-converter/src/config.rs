//! Converter configuration
//!
//! Defaults applied when a Runtime leaves a field open. Product decisions
//! such as the egress filter default live here instead of in code paths.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConverterConfig {
    #[serde(default)]
    pub kubernetes: KubernetesDefaults,

    #[serde(default)]
    pub networking: NetworkingDefaults,

    #[serde(default)]
    pub audit_log: AuditLogConfig,

    #[serde(default)]
    pub maintenance_window: MaintenanceWindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesDefaults {
    /// Version used when the Runtime does not pin one
    pub default_version: String,
}

impl Default for KubernetesDefaults {
    fn default() -> Self {
        Self {
            default_version: "1.30".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingDefaults {
    /// Network plugin used when the Runtime leaves it unset
    pub default_type: String,

    /// Egress filter state when the Runtime says nothing
    #[serde(default)]
    pub egress_filter_enabled: bool,
}

impl Default for NetworkingDefaults {
    fn default() -> Self {
        Self {
            default_type: "calico".to_string(),
            egress_filter_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogConfig {
    /// ConfigMap (in the project namespace) holding the audit policy
    #[serde(default)]
    pub policy_config_map_name: String,

    /// Path of the provider/region tenant map
    #[serde(default)]
    pub tenant_config_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindowConfig {
    /// Path of the region → window map; unset disables maintenance windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_map_path: Option<String>,
}
