//! Runtime reconciler
//!
//! Reads the Shoot fresh from Gardener, selects a [`Step`] and executes it.
//! Every invocation performs at most one Gardener mutation, records the
//! outcome in the Runtime status and returns how long to wait before the
//! next look.

use crate::error::ControllerError;
use crate::fsm::{self, Step};
use crate::metrics::{Metrics, ReconcileResult};
use crate::store::RuntimeStore;
use crds::{
    ConditionStatus, PURPOSE_PRODUCTION, RUNTIME_FINALIZER, Runtime, RuntimeConditionReason as Reason,
    RuntimeConditionType as Type, RuntimeState, RuntimeStatus,
};
use gardener_client::{
    DELETION_CONFIRMATION_ANNOTATION, GardenerClientTrait, GardenerError, LastOperationState, LastOperationType,
    MaintenanceTimeWindow, Shoot,
};
use kube_runtime::controller::Action;
use lifecycle_policy::seed_available;
use shoot_converter::{
    AuditLogData, AuditLogDataSource, AuditLogError, Converter, ConverterConfig, CreateOpts, MaintenanceWindowSource,
    PatchOpts, audit_log_configured,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Reconciles Runtime resources against Gardener Shoots.
pub struct Reconciler {
    pub(crate) gardener_client: Box<dyn GardenerClientTrait>,
    pub(crate) store: Box<dyn RuntimeStore>,
    pub(crate) metrics: Arc<dyn Metrics>,
    pub(crate) audit_log: Option<Box<dyn AuditLogDataSource>>,
    pub(crate) maintenance_windows: Option<Box<dyn MaintenanceWindowSource>>,
    pub(crate) converter_config: ConverterConfig,
    pub(crate) audit_log_mandatory: bool,
    pub(crate) requeue_after: Duration,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("namespace", &self.gardener_client.namespace())
            .field("audit_log_mandatory", &self.audit_log_mandatory)
            .field("requeue_after", &self.requeue_after)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[allow(clippy::too_many_arguments, reason = "wiring happens once in the controller")]
    pub fn new(
        gardener_client: Box<dyn GardenerClientTrait>,
        store: Box<dyn RuntimeStore>,
        metrics: Arc<dyn Metrics>,
        audit_log: Option<Box<dyn AuditLogDataSource>>,
        maintenance_windows: Option<Box<dyn MaintenanceWindowSource>>,
        converter_config: ConverterConfig,
        audit_log_mandatory: bool,
        requeue_after: Duration,
    ) -> Self {
        Self {
            gardener_client,
            store,
            metrics,
            audit_log,
            maintenance_windows,
            converter_config,
            audit_log_mandatory,
            requeue_after,
        }
    }

    /// Entry point for the watcher.
    #[instrument(skip_all, fields(runtime = runtime.metadata.name.as_deref().unwrap_or_default()))]
    pub async fn reconcile_runtime(&self, runtime: &Runtime) -> Result<Action, ControllerError> {
        let result = self.reconcile(runtime).await;
        self.metrics.reconciliation(match &result {
            Ok(action) if *action == Action::await_change() => ReconcileResult::Done,
            Ok(_) => ReconcileResult::Requeue,
            Err(_) => ReconcileResult::Error,
        });
        result
    }

    async fn reconcile(&self, runtime: &Runtime) -> Result<Action, ControllerError> {
        let name = runtime
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::InvalidConfig("Runtime missing name".to_string()))?;
        let namespace = runtime.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling Runtime {}/{}", namespace, name);

        let mut runtime = runtime.clone();
        let shoot_name = runtime.spec.shoot.name.clone();

        let shoot = match self.gardener_client.get_shoot(&shoot_name).await {
            Ok(shoot) => Some(shoot),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                error!("Failed to get Shoot {} for Runtime {}/{}: {}", shoot_name, namespace, name, e);
                let condition_type = if runtime.is_deleting() {
                    Type::Deprovisioned
                } else {
                    Type::Provisioned
                };
                let mut status = current_status(&runtime);
                status.set_condition(
                    condition_type,
                    Reason::GardenerError,
                    ConditionStatus::Unknown,
                    format!("Gardener API get error: {e}"),
                    runtime.metadata.generation,
                );
                self.persist_status(&runtime, status).await;
                return Ok(self.requeue());
            }
        };

        loop {
            let step = fsm::select(&runtime, shoot.as_ref());
            debug!("Runtime {}/{} step: {:?}", namespace, name, step);

            if step == Step::AddFinalizer {
                self.store.add_finalizer(&runtime).await?;
                runtime
                    .metadata
                    .finalizers
                    .get_or_insert_with(Vec::new)
                    .push(RUNTIME_FINALIZER.to_string());
                info!("Added finalizer to Runtime {}/{}", namespace, name);
                continue;
            }

            return self.execute(&runtime, shoot.as_ref(), step).await;
        }
    }

    async fn execute(&self, runtime: &Runtime, shoot: Option<&Shoot>, step: Step) -> Result<Action, ControllerError> {
        match (step, shoot) {
            (Step::Invalid(missing), _) => Ok(self.invalid(runtime, &missing).await),
            (Step::CreateShoot, _) => Ok(self.create_shoot(runtime).await),
            (
                Step::AwaitOperation {
                    operation,
                    state,
                    description,
                },
                _,
            ) => Ok(self.await_operation(runtime, operation, state, &description).await),
            (Step::OperationFailed { operation, description }, _) => {
                Ok(self.operation_failed(runtime, operation, &description).await)
            }
            (Step::PatchShoot, Some(shoot)) => Ok(self.patch_shoot(runtime, shoot, None).await),
            (Step::ConfirmReady, Some(shoot)) => Ok(self.confirm_ready(runtime, shoot).await),
            (Step::DeleteShoot, _) => Ok(self.delete_shoot(runtime).await),
            (Step::AwaitDeletion, _) => Ok(self.await_deletion(runtime).await),
            (Step::RemoveFinalizer, _) => self.remove_finalizer(runtime).await,
            (Step::Finished, _) => Ok(Action::await_change()),
            (step, _) => Err(ControllerError::InvalidConfig(format!("step {step:?} requires an existing Shoot"))),
        }
    }

    async fn invalid(&self, runtime: &Runtime, missing: &[String]) -> Action {
        let message = format!("Runtime is missing required labels: {}", missing.join(", "));
        warn!("{}: {}", display_name(runtime), message);
        self.stop(runtime, Type::Provisioned, Reason::ValidationError, message).await
    }

    async fn create_shoot(&self, runtime: &Runtime) -> Action {
        let shoot_spec = &runtime.spec.shoot;

        if shoot_spec.enforce_seed_location == Some(true) {
            match seed_available(self.gardener_client.as_ref(), &shoot_spec.provider.type_, &shoot_spec.region).await {
                Err(e) => {
                    let message = format!(
                        "Failed to verify whether seed is available for the region {}: {}",
                        shoot_spec.region, e
                    );
                    error!("{}: {}", display_name(runtime), message);
                    return self
                        .pending(runtime, Type::Provisioned, Reason::GardenerError, ConditionStatus::Unknown, message)
                        .await;
                }
                Ok(seeds) if !seeds.available => {
                    let message = format!(
                        "Cannot find available seed for the region {}. The following regions have seeds ready: {:?}",
                        shoot_spec.region, seeds.regions
                    );
                    error!("{}: {}", display_name(runtime), message);
                    return self.stop(runtime, Type::Provisioned, Reason::SeedNotFound, message).await;
                }
                Ok(_) => {}
            }
        }

        let audit_log_data = match self.audit_log_data(runtime) {
            Ok(data) => Some(data),
            Err(e) if self.audit_log_mandatory => {
                error!("Failed to configure audit logs for {}: {}", display_name(runtime), e);
                return self
                    .stop(
                        runtime,
                        Type::Provisioned,
                        Reason::AuditLogError,
                        format!("Failed to configure audit logs: {e}"),
                    )
                    .await;
            }
            Err(e) => {
                warn!("Audit logs not configured for {}: {}", display_name(runtime), e);
                None
            }
        };

        let opts = CreateOpts {
            namespace: self.gardener_client.namespace().to_string(),
            audit_log_data,
            maintenance_window: self.maintenance_window(runtime),
        };
        let shoot = match Converter::for_create(&self.converter_config, opts).to_shoot(runtime) {
            Ok(shoot) => shoot,
            Err(e) => {
                error!("Failed to convert Runtime {} to Shoot: {}", display_name(runtime), e);
                return self
                    .stop(
                        runtime,
                        Type::Provisioned,
                        Reason::ConversionError,
                        format!("Runtime conversion error: {e}"),
                    )
                    .await;
            }
        };

        if let Err(e) = self.gardener_client.create_shoot(&shoot).await {
            error!("Failed to create Shoot for {}: {}", display_name(runtime), e);
            return self
                .pending(
                    runtime,
                    Type::Provisioned,
                    Reason::GardenerError,
                    ConditionStatus::False,
                    format!("Gardener API create error: {e}"),
                )
                .await;
        }

        info!(
            "Gardener Shoot {}/{} created for Runtime {}",
            self.gardener_client.namespace(),
            runtime.spec.shoot.name,
            display_name(runtime)
        );
        self.pending(
            runtime,
            Type::Provisioned,
            Reason::ShootCreationPending,
            ConditionStatus::Unknown,
            "Shoot is pending",
        )
        .await
    }

    async fn await_operation(
        &self,
        runtime: &Runtime,
        operation: LastOperationType,
        state: LastOperationState,
        description: &str,
    ) -> Action {
        let reason = match operation {
            LastOperationType::Create => Reason::ShootCreationPending,
            LastOperationType::Delete => Reason::ShootDeletionPending,
            _ => Reason::ShootUpdatePending,
        };
        let message = if description.is_empty() {
            format!("Shoot operation {operation:?} is {state:?}")
        } else {
            format!("Shoot operation {operation:?} is {state:?}: {description}")
        };
        debug!("{}: {}", display_name(runtime), message);
        self.pending(runtime, Type::Provisioned, reason, ConditionStatus::Unknown, message)
            .await
    }

    async fn operation_failed(&self, runtime: &Runtime, operation: LastOperationType, description: &str) -> Action {
        let (condition_type, reason) = match operation {
            LastOperationType::Create => (Type::Provisioned, Reason::ShootCreationFailed),
            LastOperationType::Delete => (Type::Deprovisioned, Reason::ShootDeletionFailed),
            _ => (Type::Provisioned, Reason::ShootUpdateFailed),
        };
        let message = format!("Shoot operation {operation:?} failed: {description}");
        error!("{}: {}", display_name(runtime), message);

        let mut status = current_status(runtime);
        self.count_stop(&status, condition_type, reason, runtime.metadata.generation);
        status.update(
            RuntimeState::Failed,
            condition_type,
            reason,
            ConditionStatus::False,
            message,
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;
        Action::await_change()
    }

    /// Applies the patch pipeline. `audit_log_data` is looked up when not
    /// already known.
    async fn patch_shoot(&self, runtime: &Runtime, shoot: &Shoot, audit_log_data: Option<AuditLogData>) -> Action {
        let audit_log_data = audit_log_data.or_else(|| {
            self.audit_log_data(runtime)
                .inspect_err(|e| warn!("Audit logs not updated for {}: {}", display_name(runtime), e))
                .ok()
        });

        let patched = match Converter::for_patch(&self.converter_config, PatchOpts { audit_log_data }).patch(runtime, shoot) {
            Ok(patched) => patched,
            Err(e) => {
                error!("Failed to patch Shoot for {}: {}", display_name(runtime), e);
                return self
                    .stop(
                        runtime,
                        Type::Provisioned,
                        Reason::ConversionError,
                        format!("Runtime conversion error: {e}"),
                    )
                    .await;
            }
        };

        match self.gardener_client.update_shoot(&patched).await {
            Ok(_) => {
                info!("Gardener Shoot {} updated for Runtime {}", runtime.spec.shoot.name, display_name(runtime));
                self.pending(
                    runtime,
                    Type::Provisioned,
                    Reason::ShootUpdatePending,
                    ConditionStatus::Unknown,
                    "Shoot update is pending",
                )
                .await
            }
            Err(GardenerError::Conflict(message)) => {
                // re-read on the next invocation
                info!("Shoot {} changed concurrently, retrying: {}", runtime.spec.shoot.name, message);
                self.requeue()
            }
            Err(e) => {
                error!("Failed to update Shoot for {}: {}", display_name(runtime), e);
                self.pending(
                    runtime,
                    Type::Provisioned,
                    Reason::GardenerError,
                    ConditionStatus::False,
                    format!("Gardener API update error: {e}"),
                )
                .await
            }
        }
    }

    async fn confirm_ready(&self, runtime: &Runtime, shoot: &Shoot) -> Action {
        let policy = self.converter_config.audit_log.policy_config_map_name.as_str();

        let audit_log_configured = match self.audit_log_data(runtime) {
            Ok(data) if !audit_log_configured(shoot, policy, &data) => {
                info!("Configuring audit logs on Shoot {} for {}", runtime.spec.shoot.name, display_name(runtime));
                return self.patch_shoot(runtime, shoot, Some(data)).await;
            }
            Ok(_) => true,
            Err(e) if self.audit_log_mandatory => {
                error!("Failed to configure audit logs for {}: {}", display_name(runtime), e);
                return self
                    .stop(
                        runtime,
                        Type::AuditLogConfigured,
                        Reason::AuditLogError,
                        format!("Failed to configure audit logs: {e}"),
                    )
                    .await;
            }
            Err(e) => {
                warn!("Audit logs not configured for {}: {}", display_name(runtime), e);
                false
            }
        };

        let mut status = current_status(runtime);
        if audit_log_configured {
            status.set_condition(
                Type::AuditLogConfigured,
                Reason::AuditLogConfigured,
                ConditionStatus::True,
                "Audit logs configured",
                runtime.metadata.generation,
            );
        }
        status.update(
            RuntimeState::Ready,
            Type::Provisioned,
            Reason::Ready,
            ConditionStatus::True,
            "Runtime processing completed successfully",
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;
        info!("Runtime {} is ready", display_name(runtime));
        Action::await_change()
    }

    async fn delete_shoot(&self, runtime: &Runtime) -> Action {
        let shoot_name = &runtime.spec.shoot.name;

        let deleted = async {
            self.gardener_client
                .annotate_shoot(shoot_name, DELETION_CONFIRMATION_ANNOTATION, "true")
                .await?;
            self.gardener_client.delete_shoot(shoot_name).await
        }
        .await;

        match deleted {
            Ok(()) => {
                info!("Deletion of Shoot {} requested for {}", shoot_name, display_name(runtime));
                self.terminating(
                    runtime,
                    Reason::ShootDeletionPending,
                    ConditionStatus::Unknown,
                    "Shoot deletion is pending",
                )
                .await
            }
            Err(e) if e.is_not_found() => self.requeue(),
            Err(e) => {
                error!("Failed to delete Shoot {} for {}: {}", shoot_name, display_name(runtime), e);
                self.terminating(
                    runtime,
                    Reason::GardenerError,
                    ConditionStatus::False,
                    format!("Gardener API delete error: {e}"),
                )
                .await
            }
        }
    }

    async fn await_deletion(&self, runtime: &Runtime) -> Action {
        self.terminating(
            runtime,
            Reason::ShootDeletionPending,
            ConditionStatus::Unknown,
            "Shoot deletion is in progress",
        )
        .await
    }

    async fn remove_finalizer(&self, runtime: &Runtime) -> Result<Action, ControllerError> {
        let mut status = current_status(runtime);
        status.update(
            RuntimeState::Terminating,
            Type::Deprovisioned,
            Reason::ShootDeleted,
            ConditionStatus::True,
            "Shoot deleted",
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;

        self.store.remove_finalizer(runtime).await?;
        info!("Removed finalizer from Runtime {}", display_name(runtime));
        Ok(Action::await_change())
    }

    fn audit_log_data(&self, runtime: &Runtime) -> Result<AuditLogData, AuditLogError> {
        let source = self
            .audit_log
            .as_ref()
            .ok_or_else(|| AuditLogError::Invalid("no audit log tenant source configured".to_string()))?;
        source.lookup(&runtime.spec.shoot.provider.type_, &runtime.spec.shoot.region)
    }

    /// Window for production Runtimes; a failed lookup only drops the window.
    fn maintenance_window(&self, runtime: &Runtime) -> Option<MaintenanceTimeWindow> {
        if runtime.spec.shoot.purpose != PURPOSE_PRODUCTION {
            return None;
        }
        let source = self.maintenance_windows.as_ref()?;
        source
            .lookup(&runtime.spec.shoot.region)
            .inspect_err(|e| warn!("No maintenance window for {}: {}", display_name(runtime), e))
            .ok()
    }

    /// Terminal error: counted, recorded and not retried until the Runtime changes.
    async fn stop(&self, runtime: &Runtime, type_: Type, reason: Reason, message: String) -> Action {
        let mut status = current_status(runtime);
        self.count_stop(&status, type_, reason, runtime.metadata.generation);
        status.update(
            RuntimeState::Pending,
            type_,
            reason,
            ConditionStatus::False,
            message,
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;
        Action::await_change()
    }

    /// Counts a stop unless the status already reports it for this generation,
    /// so re-delivered events of a stopped Runtime are not counted again.
    fn count_stop(&self, status: &RuntimeStatus, type_: Type, reason: Reason, generation: Option<i64>) {
        if !status.reports(type_, reason, ConditionStatus::False, generation) {
            self.metrics.fsm_stop();
        }
    }

    async fn pending(
        &self,
        runtime: &Runtime,
        type_: Type,
        reason: Reason,
        condition_status: ConditionStatus,
        message: impl Into<String>,
    ) -> Action {
        let mut status = current_status(runtime);
        status.update(
            RuntimeState::Pending,
            type_,
            reason,
            condition_status,
            message,
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;
        self.requeue()
    }

    async fn terminating(
        &self,
        runtime: &Runtime,
        reason: Reason,
        condition_status: ConditionStatus,
        message: impl Into<String>,
    ) -> Action {
        let mut status = current_status(runtime);
        status.update(
            RuntimeState::Terminating,
            Type::Deprovisioned,
            reason,
            condition_status,
            message,
            runtime.metadata.generation,
        );
        self.persist_status(runtime, status).await;
        self.requeue()
    }

    /// Writes `status` when it differs from the observed one. Failures are
    /// logged only; the caller's outcome stands.
    async fn persist_status(&self, runtime: &Runtime, status: RuntimeStatus) {
        if runtime.status.as_ref() == Some(&status) {
            debug!("Runtime {} status is up-to-date, skipping update", display_name(runtime));
            return;
        }
        if let Err(e) = self.store.update_status(runtime, &status).await {
            error!("Failed to update status of Runtime {}: {}", display_name(runtime), e);
        }
    }

    fn requeue(&self) -> Action {
        Action::requeue(self.requeue_after)
    }
}

fn current_status(runtime: &Runtime) -> RuntimeStatus {
    runtime.status.clone().unwrap_or_default()
}

fn display_name(runtime: &Runtime) -> String {
    format!(
        "{}/{}",
        runtime.metadata.namespace.as_deref().unwrap_or("default"),
        runtime.metadata.name.as_deref().unwrap_or_default()
    )
}
