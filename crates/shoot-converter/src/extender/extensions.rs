//! Network filter and OIDC service extensions.

use super::{Extender, upsert_extension};
use crate::config::NetworkingDefaults;
use crate::error::ConverterError;
use crds::Runtime;
use gardener_client::{Extension, Shoot};
use serde_json::json;

pub const NETWORK_FILTER_EXTENSION_TYPE: &str = "shoot-networking-filter";
pub const OIDC_EXTENSION_TYPE: &str = "shoot-oidc-service";

/// Egress filter extension; disabled unless egress filtering is enabled.
pub fn extend_with_network_filter(defaults: &NetworkingDefaults) -> Extender {
    let egress_default = defaults.egress_filter_enabled;

    Box::new(move |runtime: &Runtime, shoot: &mut Shoot| -> Result<(), ConverterError> {
        let enabled = runtime
            .spec
            .security
            .networking
            .filter
            .egress
            .as_ref()
            .map_or(egress_default, |e| e.enabled);

        let provider_config = enabled.then(|| {
            json!({
                "apiVersion": "networking-filter.extensions.gardener.cloud/v1alpha1",
                "kind": "Configuration",
                "egressFilter": {"blackholingEnabled": true},
            })
        });

        upsert_extension(
            &mut shoot.spec.extensions,
            Extension {
                type_: NETWORK_FILTER_EXTENSION_TYPE.to_string(),
                provider_config,
                disabled: Some(!enabled),
            },
        );
        Ok(())
    })
}

pub fn extend_with_oidc_extension(_runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    upsert_extension(
        &mut shoot.spec.extensions,
        Extension {
            type_: OIDC_EXTENSION_TYPE.to_string(),
            provider_config: None,
            disabled: Some(false),
        },
    );
    Ok(())
}
