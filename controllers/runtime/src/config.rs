//! Controller configuration
//!
//! Read once from the environment in `main`.

use crate::error::ControllerError;
use shoot_converter::ConverterConfig;
use std::env;
use std::time::Duration;

pub const DEFAULT_GARDENER_KUBECONFIG_PATH: &str = "/gardener/kubeconfig/kubeconfig";
pub const DEFAULT_WATCH_NAMESPACE: &str = "kcp-system";
pub const DEFAULT_REQUEUE_SECONDS: u64 = 15;
pub const DEFAULT_RECONCILE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_CONCURRENCY: u16 = 5;

#[derive(Debug, Clone)]
pub struct RuntimeControllerConfig {
    pub gardener_kubeconfig_path: String,
    pub gardener_project_name: String,
    pub watch_namespace: String,
    /// Fixed delay for every "check again later" outcome
    pub requeue_after: Duration,
    pub reconcile_timeout: Duration,
    /// Stop provisioning when no audit log tenant exists for the region
    pub audit_log_mandatory: bool,
    pub metrics_port: u16,
    pub concurrency: u16,
    pub converter: ConverterConfig,
}

impl RuntimeControllerConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        let gardener_project_name = env::var("GARDENER_PROJECT_NAME").map_err(|_| {
            ControllerError::InvalidConfig("GARDENER_PROJECT_NAME environment variable is required".to_string())
        })?;

        let mut converter = ConverterConfig::default();
        if let Ok(version) = env::var("DEFAULT_KUBERNETES_VERSION") {
            converter.kubernetes.default_version = version;
        }
        converter.networking.egress_filter_enabled = env_var_or_default("EGRESS_FILTER_ENABLED_DEFAULT", false);
        converter.audit_log.tenant_config_path = env::var("AUDIT_LOG_TENANT_CONFIG_PATH").unwrap_or_default();
        converter.audit_log.policy_config_map_name = env::var("AUDIT_LOG_POLICY_CONFIG_MAP_NAME").unwrap_or_default();
        converter.maintenance_window.window_map_path = env::var("MAINTENANCE_WINDOW_MAP_PATH").ok();

        let config = Self {
            gardener_kubeconfig_path: env::var("GARDENER_KUBECONFIG_PATH")
                .unwrap_or_else(|_| DEFAULT_GARDENER_KUBECONFIG_PATH.to_string()),
            gardener_project_name,
            watch_namespace: env::var("WATCH_NAMESPACE").unwrap_or_else(|_| DEFAULT_WATCH_NAMESPACE.to_string()),
            requeue_after: Duration::from_secs(env_var_or_default("GARDENER_REQUEUE_SECONDS", DEFAULT_REQUEUE_SECONDS)),
            reconcile_timeout: Duration::from_secs(env_var_or_default(
                "RECONCILE_TIMEOUT_SECONDS",
                DEFAULT_RECONCILE_TIMEOUT_SECONDS,
            )),
            audit_log_mandatory: env_var_or_default("AUDIT_LOG_MANDATORY", true),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            concurrency: env_var_or_default("CONTROLLER_CONCURRENCY", DEFAULT_CONCURRENCY),
            converter,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if self.gardener_project_name.is_empty() {
            return Err(ControllerError::InvalidConfig("GARDENER_PROJECT_NAME must not be empty".to_string()));
        }
        if self.audit_log_mandatory && self.converter.audit_log.tenant_config_path.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "AUDIT_LOG_TENANT_CONFIG_PATH is required when AUDIT_LOG_MANDATORY is true".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ControllerError::InvalidConfig("CONTROLLER_CONCURRENCY must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
