//! Maintenance time window for production clusters.

use super::Extender;
use crate::error::ConverterError;
use crds::{PURPOSE_PRODUCTION, Runtime};
use gardener_client::{Maintenance, MaintenanceTimeWindow, Shoot};

/// Sets the window only for `production` Runtimes and only when one resolved.
pub fn extend_with_maintenance_window(window: Option<MaintenanceTimeWindow>) -> Extender {
    Box::new(move |runtime: &Runtime, shoot: &mut Shoot| -> Result<(), ConverterError> {
        if runtime.spec.shoot.purpose != PURPOSE_PRODUCTION {
            return Ok(());
        }
        if let Some(window) = &window {
            shoot
                .spec
                .maintenance
                .get_or_insert_with(Maintenance::default)
                .time_window = Some(window.clone());
        }
        Ok(())
    })
}
