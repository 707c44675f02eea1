//! Cluster networking CIDRs.

use super::Extender;
use crate::config::NetworkingDefaults;
use crate::error::ConverterError;
use crds::Runtime;
use gardener_client::{Shoot, ShootNetworking};

pub fn extend_with_networking(defaults: &NetworkingDefaults) -> Extender {
    let default_type = defaults.default_type.clone();

    Box::new(move |runtime: &Runtime, shoot: &mut Shoot| -> Result<(), ConverterError> {
        let networking = &runtime.spec.shoot.networking;
        for (field, value) in [
            ("networking.pods", &networking.pods),
            ("networking.nodes", &networking.nodes),
            ("networking.services", &networking.services),
        ] {
            if value.is_empty() {
                return Err(ConverterError::MissingField(field.to_string()));
            }
        }

        let target = shoot.spec.networking.get_or_insert_with(ShootNetworking::default);
        target.type_ = Some(networking.type_.clone().unwrap_or_else(|| default_type.clone()));
        target.pods = Some(networking.pods.clone());
        target.nodes = Some(networking.nodes.clone());
        target.services = Some(networking.services.clone());
        Ok(())
    })
}
