//! Shoot builder
//!
//! A [`Converter`] is an ordered list of extenders. `for_create` emits the
//! full Shoot document; `for_patch` re-asserts only the fields this system
//! owns on an existing Shoot.

use crate::audit_log::AuditLogData;
use crate::config::ConverterConfig;
use crate::error::ConverterError;
use crate::extender::{
    Extender, annotations, auditlogs, control_plane, exposure_class, extensions, kubernetes, maintenance,
    networking, provider,
};
use crds::Runtime;
use gardener_client::{MaintenanceTimeWindow, Shoot, ShootSpec};
use tracing::debug;

/// Inputs resolved by the caller before building a new Shoot.
#[derive(Debug, Clone, Default)]
pub struct CreateOpts {
    /// Gardener project namespace the Shoot lives in
    pub namespace: String,
    pub audit_log_data: Option<AuditLogData>,
    pub maintenance_window: Option<MaintenanceTimeWindow>,
}

/// Inputs resolved by the caller before patching an existing Shoot.
#[derive(Debug, Clone, Default)]
pub struct PatchOpts {
    pub audit_log_data: Option<AuditLogData>,
}

pub struct Converter {
    extenders: Vec<(&'static str, Extender)>,
}

impl Converter {
    /// Pipeline producing a complete Shoot.
    pub fn for_create(config: &ConverterConfig, opts: CreateOpts) -> Self {
        let namespace = opts.namespace;
        let extenders: Vec<(&'static str, Extender)> = vec![
            step("metadata", move |runtime: &Runtime, shoot: &mut Shoot| {
                if runtime.spec.shoot.name.is_empty() {
                    return Err(ConverterError::MissingField("shoot.name".to_string()));
                }
                shoot.metadata.name = Some(runtime.spec.shoot.name.clone());
                shoot.metadata.namespace = Some(namespace.clone());
                Ok(())
            }),
            step("annotations", annotations::extend_with_annotations),
            step("labels", annotations::extend_with_labels),
            step("provider", provider::extend_with_provider),
            ("networking", networking::extend_with_networking(&config.networking)),
            ("kubernetes", kubernetes::extend_with_kubernetes(&config.kubernetes)),
            step("controlPlane", control_plane::extend_with_control_plane),
            step("exposureClass", exposure_class::extend_with_exposure_class),
            ("networkFilter", extensions::extend_with_network_filter(&config.networking)),
            step("oidcExtension", extensions::extend_with_oidc_extension),
            (
                "auditLog",
                auditlogs::extend_with_audit_log(config.audit_log.policy_config_map_name.clone(), opts.audit_log_data),
            ),
            ("maintenance", maintenance::extend_with_maintenance_window(opts.maintenance_window)),
        ];
        Self { extenders }
    }

    /// Reduced pipeline for an existing Shoot. Fields owned by Gardener or
    /// other controllers (provider configs, networking, maintenance) are left
    /// untouched.
    pub fn for_patch(config: &ConverterConfig, opts: PatchOpts) -> Self {
        let extenders: Vec<(&'static str, Extender)> = vec![
            step("annotations", annotations::extend_with_annotations),
            step("labels", annotations::extend_with_labels),
            step("workers", provider::extend_with_workers),
            ("kubernetes", kubernetes::extend_with_kubernetes(&config.kubernetes)),
            ("networkFilter", extensions::extend_with_network_filter(&config.networking)),
            (
                "auditLog",
                auditlogs::extend_with_audit_log(config.audit_log.policy_config_map_name.clone(), opts.audit_log_data),
            ),
        ];
        Self { extenders }
    }

    /// Names of the extenders in execution order.
    pub fn steps(&self) -> Vec<&'static str> {
        self.extenders.iter().map(|(name, _)| *name).collect()
    }

    /// Builds a new Shoot for the Runtime.
    pub fn to_shoot(&self, runtime: &Runtime) -> Result<Shoot, ConverterError> {
        let mut shoot = Shoot::new(&runtime.spec.shoot.name, ShootSpec::default());
        self.apply(runtime, &mut shoot)?;
        Ok(shoot)
    }

    /// Returns a copy of `current` with the owned fields re-asserted.
    ///
    /// `current` is never modified, so a failed patch leaves nothing behind.
    pub fn patch(&self, runtime: &Runtime, current: &Shoot) -> Result<Shoot, ConverterError> {
        let mut shoot = current.clone();
        self.apply(runtime, &mut shoot)?;
        Ok(shoot)
    }

    fn apply(&self, runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
        for (name, extender) in &self.extenders {
            extender(runtime, shoot).inspect_err(|e| debug!("Extender {} failed: {}", name, e))?;
        }
        Ok(())
    }
}

fn step<F>(name: &'static str, extender: F) -> (&'static str, Extender)
where
    F: Fn(&Runtime, &mut Shoot) -> Result<(), ConverterError> + Send + Sync + 'static,
{
    (name, Box::new(extender))
}
