//! Hyperscaler provider types
//!
//! Provider-specific Shoot settings are looked up in explicit tables keyed by
//! [`ProviderType`]; a provider missing from a table simply has no value.

use crate::error::ConverterError;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Supported infrastructure providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Aws,
    Azure,
    Gcp,
    OpenStack,
}

/// Exposure class per provider. Only providers listed here get one.
const EXPOSURE_CLASSES: &[(ProviderType, &str)] = &[(ProviderType::OpenStack, "converged-cloud-internet")];

/// Gardener cloud profile per provider.
const CLOUD_PROFILES: &[(ProviderType, &str)] = &[
    (ProviderType::Aws, "aws"),
    (ProviderType::Azure, "az"),
    (ProviderType::Gcp, "gcp"),
    (ProviderType::OpenStack, "converged-cloud-kyma"),
];

impl ProviderType {
    /// Provider type string as used by Gardener.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Aws => "aws",
            ProviderType::Azure => "azure",
            ProviderType::Gcp => "gcp",
            ProviderType::OpenStack => "openstack",
        }
    }

    pub fn exposure_class_name(&self) -> Option<&'static str> {
        lookup(EXPOSURE_CLASSES, *self)
    }

    pub fn cloud_profile_name(&self) -> Option<&'static str> {
        lookup(CLOUD_PROFILES, *self)
    }

    fn extension_api_version(&self) -> String {
        format!("{}.provider.extensions.gardener.cloud/v1alpha1", self.as_str())
    }

    /// Provider-specific `infrastructureConfig` for the given node CIDR.
    pub fn infrastructure_config(&self, nodes_cidr: &str, zones: &[String]) -> Value {
        let networks = match self {
            ProviderType::Aws => json!({
                "vpc": {"cidr": nodes_cidr},
                "zones": zones.iter().map(|z| json!({"name": z})).collect::<Vec<_>>(),
            }),
            ProviderType::Azure => json!({
                "vnet": {"cidr": nodes_cidr},
                "workers": nodes_cidr,
            }),
            ProviderType::Gcp => json!({"workers": nodes_cidr}),
            ProviderType::OpenStack => json!({"workers": nodes_cidr}),
        };

        let mut config = json!({
            "apiVersion": self.extension_api_version(),
            "kind": "InfrastructureConfig",
            "networks": networks,
        });
        if *self == ProviderType::OpenStack {
            config["floatingPoolName"] = json!("FloatingIP-external-kyma-01");
        }
        config
    }

    /// Provider-specific `controlPlaneConfig`.
    pub fn control_plane_config(&self) -> Value {
        let mut config = json!({
            "apiVersion": self.extension_api_version(),
            "kind": "ControlPlaneConfig",
        });
        if *self == ProviderType::OpenStack {
            config["loadBalancerProvider"] = json!("f5");
        }
        config
    }
}

fn lookup(table: &[(ProviderType, &'static str)], provider: ProviderType) -> Option<&'static str> {
    table.iter().find(|(p, _)| *p == provider).map(|(_, v)| *v)
}

impl FromStr for ProviderType {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(ProviderType::Aws),
            "azure" => Ok(ProviderType::Azure),
            "gcp" => Ok(ProviderType::Gcp),
            "openstack" => Ok(ProviderType::OpenStack),
            other => Err(ConverterError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
