//! Controller configuration

use crate::error::ControllerError;
use std::env;
use std::time::Duration;

pub const DEFAULT_GARDENER_KUBECONFIG_PATH: &str = "/gardener/kubeconfig/kubeconfig";
pub const DEFAULT_WATCH_NAMESPACE: &str = "kcp-system";
pub const DEFAULT_ROTATION_PERIOD_MINUTES: u64 = 1440;
pub const DEFAULT_ERROR_REQUEUE_SECONDS: u64 = 60;
pub const DEFAULT_RECONCILE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_CONCURRENCY: u16 = 5;

#[derive(Debug, Clone)]
pub struct GardenerClusterControllerConfig {
    pub gardener_kubeconfig_path: String,
    pub gardener_project_name: String,
    pub watch_namespace: String,
    pub rotation_period: Duration,
    /// Lifetime requested for issued admin kubeconfigs
    pub kubeconfig_expiration: Duration,
    pub error_requeue_after: Duration,
    pub reconcile_timeout: Duration,
    pub concurrency: u16,
}

impl GardenerClusterControllerConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        let gardener_project_name = env::var("GARDENER_PROJECT_NAME").map_err(|_| {
            ControllerError::InvalidConfig("GARDENER_PROJECT_NAME environment variable is required".to_string())
        })?;

        let rotation_minutes = env_var_or_default("KUBECONFIG_ROTATION_PERIOD_MINUTES", DEFAULT_ROTATION_PERIOD_MINUTES);
        let expiration_minutes = env_var_or_default("KUBECONFIG_EXPIRATION_MINUTES", rotation_minutes);

        let config = Self {
            gardener_kubeconfig_path: env::var("GARDENER_KUBECONFIG_PATH")
                .unwrap_or_else(|_| DEFAULT_GARDENER_KUBECONFIG_PATH.to_string()),
            gardener_project_name,
            watch_namespace: env::var("WATCH_NAMESPACE").unwrap_or_else(|_| DEFAULT_WATCH_NAMESPACE.to_string()),
            rotation_period: Duration::from_secs(rotation_minutes * 60),
            kubeconfig_expiration: Duration::from_secs(expiration_minutes * 60),
            error_requeue_after: Duration::from_secs(env_var_or_default(
                "ERROR_REQUEUE_SECONDS",
                DEFAULT_ERROR_REQUEUE_SECONDS,
            )),
            reconcile_timeout: Duration::from_secs(env_var_or_default(
                "RECONCILE_TIMEOUT_SECONDS",
                DEFAULT_RECONCILE_TIMEOUT_SECONDS,
            )),
            concurrency: env_var_or_default("CONTROLLER_CONCURRENCY", DEFAULT_CONCURRENCY),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if self.gardener_project_name.is_empty() {
            return Err(ControllerError::InvalidConfig("GARDENER_PROJECT_NAME must not be empty".to_string()));
        }
        if self.rotation_period.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "KUBECONFIG_ROTATION_PERIOD_MINUTES must be at least 1".to_string(),
            ));
        }
        if self.kubeconfig_expiration < self.rotation_period {
            return Err(ControllerError::InvalidConfig(
                "KUBECONFIG_EXPIRATION_MINUTES must not be shorter than the rotation period".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ControllerError::InvalidConfig("CONTROLLER_CONCURRENCY must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_var_or_default<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GardenerClusterControllerConfig {
        GardenerClusterControllerConfig {
            gardener_kubeconfig_path: DEFAULT_GARDENER_KUBECONFIG_PATH.to_string(),
            gardener_project_name: "kyma".to_string(),
            watch_namespace: DEFAULT_WATCH_NAMESPACE.to_string(),
            rotation_period: Duration::from_secs(DEFAULT_ROTATION_PERIOD_MINUTES * 60),
            kubeconfig_expiration: Duration::from_secs(DEFAULT_ROTATION_PERIOD_MINUTES * 60),
            error_requeue_after: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECONDS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECONDS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_expiration_shorter_than_period_is_rejected() {
        let mut config = config();
        config.kubeconfig_expiration = Duration::from_secs(60);
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));
    }
}
