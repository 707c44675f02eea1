//! Control plane high availability.

use crate::error::ConverterError;
use crds::Runtime;
use gardener_client::{Shoot, ShootControlPlane, ShootFailureTolerance, ShootHighAvailability};

const FAILURE_TOLERANCE_TYPES: [&str; 2] = ["node", "zone"];

pub fn extend_with_control_plane(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let Some(ha) = runtime
        .spec
        .shoot
        .control_plane
        .as_ref()
        .and_then(|cp| cp.high_availability.as_ref())
    else {
        return Ok(());
    };

    let tolerance = ha.failure_tolerance.type_.as_str();
    if !FAILURE_TOLERANCE_TYPES.contains(&tolerance) {
        return Err(ConverterError::InvalidValue {
            field: "controlPlane.highAvailability.failureTolerance.type".to_string(),
            reason: format!("{tolerance:?} is not one of {FAILURE_TOLERANCE_TYPES:?}"),
        });
    }

    shoot.spec.control_plane.get_or_insert_with(ShootControlPlane::default).high_availability =
        Some(ShootHighAvailability {
            failure_tolerance: ShootFailureTolerance {
                type_: tolerance.to_string(),
            },
        });
    Ok(())
}
