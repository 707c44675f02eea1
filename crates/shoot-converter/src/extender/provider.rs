//! Provider block: region, credentials binding, workers and provider configs.

use crate::error::ConverterError;
use crate::provider::ProviderType;
use crds::{Runtime, Worker};
use gardener_client::{Shoot, ShootMachine, ShootMachineImage, ShootVolume, ShootWorker};

/// Full provider block for a new Shoot.
pub fn extend_with_provider(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let spec = &runtime.spec.shoot;
    let provider: ProviderType = spec.provider.type_.parse()?;

    if spec.region.is_empty() {
        return Err(ConverterError::MissingField("region".to_string()));
    }
    if spec.secret_binding_name.is_empty() {
        return Err(ConverterError::MissingField("secretBindingName".to_string()));
    }

    shoot.spec.region = spec.region.clone();
    shoot.spec.secret_binding_name = Some(spec.secret_binding_name.clone());
    shoot.spec.cloud_profile_name = provider.cloud_profile_name().map(str::to_string);
    if !spec.purpose.is_empty() {
        shoot.spec.purpose = Some(spec.purpose.clone());
    }

    let zones = spec
        .provider
        .workers
        .first()
        .map(|w| w.zones.clone())
        .unwrap_or_default();
    shoot.spec.provider.type_ = provider.as_str().to_string();
    shoot.spec.provider.infrastructure_config = Some(provider.infrastructure_config(&spec.networking.nodes, &zones));
    shoot.spec.provider.control_plane_config = Some(provider.control_plane_config());

    extend_with_workers(runtime, shoot)
}

/// Worker pools only. Safe to apply to an existing Shoot: fields of a pool
/// that the Runtime does not describe are kept from the pool of the same name.
pub fn extend_with_workers(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let workers = &runtime.spec.shoot.provider.workers;
    if workers.is_empty() {
        return Err(ConverterError::MissingField("provider.workers".to_string()));
    }

    let current = std::mem::take(&mut shoot.spec.provider.workers);
    shoot.spec.provider.workers = workers
        .iter()
        .map(|worker| to_shoot_worker(worker, current.iter().find(|w| w.name == worker.name)))
        .collect::<Result<Vec<_>, ConverterError>>()?;
    Ok(())
}

fn to_shoot_worker(worker: &Worker, current: Option<&ShootWorker>) -> Result<ShootWorker, ConverterError> {
    if worker.minimum > worker.maximum {
        return Err(ConverterError::InvalidValue {
            field: format!("provider.workers[{}].minimum", worker.name),
            reason: format!("minimum {} exceeds maximum {}", worker.minimum, worker.maximum),
        });
    }

    Ok(ShootWorker {
        name: worker.name.clone(),
        machine: ShootMachine {
            type_: worker.machine.type_.clone(),
            image: worker.machine.image.as_ref().map(|i| ShootMachineImage {
                name: i.name.clone(),
                version: i.version.clone(),
            }),
            extra: current.map(|w| w.machine.extra.clone()).unwrap_or_default(),
        },
        minimum: worker.minimum,
        maximum: worker.maximum,
        max_surge: worker.max_surge,
        max_unavailable: worker.max_unavailable,
        volume: worker.volume.as_ref().map(|v| ShootVolume {
            type_: v.type_.clone(),
            volume_size: v.volume_size.clone(),
        }),
        zones: worker.zones.clone(),
        extra: current.map(|w| w.extra.clone()).unwrap_or_default(),
    })
}
