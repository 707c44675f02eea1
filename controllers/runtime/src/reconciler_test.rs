//! Unit tests for the Runtime reconciler

#[cfg(test)]
mod tests {
    use crate::metrics::ReconcileResult;
    use crate::test_utils::*;
    use crds::{Condition, ConditionStatus, RuntimeState, RuntimeStatus, find_condition};
    use gardener_client::{
        DELETION_CONFIRMATION_ANNOTATION, LastOperationState, LastOperationType, MockOperation,
        RUNTIME_GENERATION_ANNOTATION, Seed,
    };
    use kube_runtime::controller::Action;
    use serde_json::json;
    use shoot_converter::{AUDITLOG_EXTENSION_TYPE, Converter, PatchOpts};

    fn condition(status: &RuntimeStatus, type_: &str) -> Condition {
        find_condition(&status.conditions, type_)
            .cloned()
            .unwrap_or_else(|| panic!("condition {type_} missing in {status:?}"))
    }

    fn create_test_seed(name: &str, provider: &str, region: &str) -> Seed {
        serde_json::from_value(json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Seed",
            "metadata": {"name": name},
            "spec": {
                "provider": {"type": provider, "region": region},
                "settings": {"scheduling": {"visible": true}}
            },
            "status": {
                "conditions": [
                    {"type": "GardenletReady", "status": "True"},
                    {"type": "SeedSystemComponentsHealthy", "status": "True"}
                ]
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_shoot_for_new_runtime() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 1);

        let shoot = harness.gardener.shoot("c-1a2b3c").expect("Shoot should be created");
        assert_eq!(shoot.metadata.namespace.as_deref(), Some(TEST_NAMESPACE));
        assert!(shoot.spec.maintenance.is_none(), "evaluation Shoots get no maintenance window");
        assert!(shoot.extension(AUDITLOG_EXTENSION_TYPE).is_some());

        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Pending));
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::Unknown);
        assert_eq!(provisioned.reason, "ShootCreationPending");
        assert_eq!(provisioned.observed_generation, Some(2));
    }

    #[tokio::test]
    async fn test_adds_finalizer_then_creates_in_same_pass() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        runtime.metadata.finalizers = None;

        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(harness.store.finalizers_added.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 1);
    }

    #[tokio::test]
    async fn test_processing_operation_only_waits() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Processing,
        ));

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 0);
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 0);

        let status = harness.store.last_status().unwrap();
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::Unknown);
        assert_eq!(provisioned.reason, "ShootCreationPending");
    }

    #[tokio::test]
    async fn test_unchanged_status_is_not_written_again() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Processing,
        ));

        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(harness.store.status_writes(), 1);

        runtime.status = harness.store.last_status();
        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(harness.store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_succeeded_shoot_gets_missing_audit_log_patched_in() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        let shoot = create_test_shoot(&runtime, LastOperationType::Create, LastOperationState::Succeeded);
        assert!(shoot.extension(AUDITLOG_EXTENSION_TYPE).is_none());
        harness.gardener.add_shoot(shoot);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 1);
        let updated = harness.gardener.shoot("c-1a2b3c").unwrap();
        assert!(updated.extension(AUDITLOG_EXTENSION_TYPE).is_some());

        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").reason, "ShootUpdatePending");
    }

    #[tokio::test]
    async fn test_succeeded_shoot_with_audit_log_is_ready() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        let shoot = create_test_shoot(&runtime, LastOperationType::Create, LastOperationState::Succeeded);
        let opts = PatchOpts {
            audit_log_data: Some(create_test_audit_data()),
        };
        let shoot = Converter::for_patch(&harness.reconciler.converter_config, opts)
            .patch(&runtime, &shoot)
            .unwrap();
        harness.gardener.add_shoot(shoot);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 0);

        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Ready));
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::True);
        assert_eq!(provisioned.reason, "Ready");
        assert_eq!(condition(&status, "AuditLogConfigured").status, ConditionStatus::True);
        assert_eq!(*harness.metrics.results.lock().unwrap(), vec![ReconcileResult::Done]);
    }

    #[tokio::test]
    async fn test_missing_seed_stops_once() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        harness.gardener.add_seed(create_test_seed("aws-eu1", "aws", "eu-central-1"));
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        runtime.spec.shoot.enforce_seed_location = Some(true);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 0);

        let status = harness.store.last_status().unwrap();
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::False);
        assert_eq!(provisioned.reason, "SeedNotFound");
        assert!(provisioned.message.contains("eu-central-1"));

        // the status write triggers another reconcile of the same generation
        runtime.status = Some(status);
        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        assert_eq!(harness.store.status_writes(), 1);

        runtime.metadata.generation = Some(3);
        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(harness.metrics.stops(), 2);
    }

    #[tokio::test]
    async fn test_seed_lookup_error_is_retried() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        harness.gardener.fail(MockOperation::ListSeeds);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        runtime.spec.shoot.enforce_seed_location = Some(true);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.metrics.stops(), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").status, ConditionStatus::Unknown);
    }

    #[tokio::test]
    async fn test_mandatory_audit_log_failure_is_terminal() {
        let harness = create_test_reconciler(None, true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").reason, "AuditLogError");
    }

    #[tokio::test]
    async fn test_optional_audit_log_failure_still_creates() {
        let harness = create_test_reconciler(None, false);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");

        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 1);
        let shoot = harness.gardener.shoot("c-1a2b3c").unwrap();
        assert!(shoot.extension(AUDITLOG_EXTENSION_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_missing_labels_stop() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        runtime.metadata.labels = None;

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").reason, "ValidationError");
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_a_conversion_error() {
        let harness = create_test_reconciler(None, false);
        let runtime = create_test_runtime("alicloud", "eu-west-1", "evaluation");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").reason, "ConversionError");
    }

    #[tokio::test]
    async fn test_create_error_is_retried() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        harness.gardener.fail(MockOperation::CreateShoot);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.metrics.stops(), 0);
        let status = harness.store.last_status().unwrap();
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::False);
        assert_eq!(provisioned.reason, "GardenerError");
    }

    #[tokio::test]
    async fn test_get_error_is_retried() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        harness.gardener.fail(MockOperation::GetShoot);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::CreateShoot), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(condition(&status, "Provisioned").status, ConditionStatus::Unknown);
    }

    #[tokio::test]
    async fn test_failed_operation_is_terminal() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Failed,
        ));

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.metrics.stops(), 1);
        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Failed));
        assert_eq!(condition(&status, "Provisioned").reason, "ShootCreationFailed");

        let mut runtime = runtime;
        runtime.status = Some(status);
        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(harness.metrics.stops(), 1);
    }

    #[tokio::test]
    async fn test_changed_runtime_patches_shoot() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Failed,
        ));
        runtime.metadata.generation = Some(3);
        runtime.spec.shoot.provider.workers[0].maximum = 5;

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 1);
        let shoot = harness.gardener.shoot("c-1a2b3c").unwrap();
        assert_eq!(shoot.runtime_generation(), Some(3));
        assert_eq!(
            shoot.metadata.annotations.as_ref().unwrap()[RUNTIME_GENERATION_ANNOTATION],
            "3"
        );
        assert_eq!(shoot.spec.provider.workers[0].maximum, 5);
        assert_eq!(harness.metrics.stops(), 0);
    }

    #[tokio::test]
    async fn test_changed_runtime_patches_shoot_while_operation_runs() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Processing,
        ));
        runtime.metadata.generation = Some(3);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 1);
        assert_eq!(harness.gardener.shoot("c-1a2b3c").unwrap().runtime_generation(), Some(3));
    }

    #[tokio::test]
    async fn test_update_error_is_retried() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Succeeded,
        ));
        harness.gardener.fail(MockOperation::UpdateShoot);

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 1);
        assert_eq!(harness.metrics.stops(), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Pending));
        let provisioned = condition(&status, "Provisioned");
        assert_eq!(provisioned.status, ConditionStatus::False);
        assert_eq!(provisioned.reason, "GardenerError");
    }

    #[tokio::test]
    async fn test_update_conflict_requeues_without_status_write() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Create,
            LastOperationState::Succeeded,
        ));
        harness.gardener.write_concurrently("c-1a2b3c");

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::UpdateShoot), 1);
        assert!(harness.gardener.shoot("c-1a2b3c").unwrap().extension(AUDITLOG_EXTENSION_TYPE).is_none());
        assert_eq!(harness.store.status_writes(), 0);
        assert_eq!(harness.metrics.stops(), 0);
    }

    #[tokio::test]
    async fn test_delete_error_is_retried() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Reconcile,
            LastOperationState::Succeeded,
        ));
        harness.gardener.fail(MockOperation::DeleteShoot);
        runtime.metadata.deletion_timestamp = Some(gardener_client::now_timestamp().unwrap());

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert!(!harness.gardener.shoot("c-1a2b3c").unwrap().is_deleting());
        assert_eq!(harness.store.finalizers_removed.load(std::sync::atomic::Ordering::SeqCst), 0);
        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Terminating));
        let deprovisioned = condition(&status, "Deprovisioned");
        assert_eq!(deprovisioned.status, ConditionStatus::False);
        assert_eq!(deprovisioned.reason, "GardenerError");
    }

    #[tokio::test]
    async fn test_deletion_confirms_and_deletes_shoot() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        harness.gardener.add_shoot(create_test_shoot(
            &runtime,
            LastOperationType::Reconcile,
            LastOperationState::Succeeded,
        ));
        runtime.metadata.deletion_timestamp = Some(gardener_client::now_timestamp().unwrap());

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::requeue(TEST_REQUEUE));
        assert_eq!(harness.gardener.calls(MockOperation::DeleteShoot), 1);
        let shoot = harness.gardener.shoot("c-1a2b3c").unwrap();
        assert_eq!(
            shoot.metadata.annotations.as_ref().unwrap()[DELETION_CONFIRMATION_ANNOTATION],
            "true"
        );
        assert!(shoot.is_deleting());

        let status = harness.store.last_status().unwrap();
        assert_eq!(status.state, Some(RuntimeState::Terminating));
        assert_eq!(condition(&status, "Deprovisioned").reason, "ShootDeletionPending");

        // second pass waits for Gardener
        harness.reconciler.reconcile_runtime(&runtime).await.unwrap();
        assert_eq!(harness.gardener.calls(MockOperation::DeleteShoot), 1);
        assert_eq!(harness.store.finalizers_removed.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finalizer_removed_once_shoot_is_gone() {
        let harness = create_test_reconciler(Some(create_test_audit_data()), true);
        let mut runtime = create_test_runtime("aws", "eu-west-1", "evaluation");
        runtime.metadata.deletion_timestamp = Some(gardener_client::now_timestamp().unwrap());

        let action = harness.reconciler.reconcile_runtime(&runtime).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.store.finalizers_removed.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(harness.gardener.calls(MockOperation::DeleteShoot), 0);
        let status = harness.store.last_status().unwrap();
        let deprovisioned = condition(&status, "Deprovisioned");
        assert_eq!(deprovisioned.status, ConditionStatus::True);
        assert_eq!(deprovisioned.reason, "ShootDeleted");
    }
}
