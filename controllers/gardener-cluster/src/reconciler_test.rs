//! Unit tests for the GardenerCluster reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
    use crds::{
        CLUSTER_NAME_LABEL, ConditionStatus, GardenerClusterState, LAST_SYNC_ANNOTATION, MANAGED_BY_LABEL,
        MANAGED_BY_VALUE,
    };
    use gardener_client::MockOperation;
    use kube_runtime::controller::Action;
    use std::time::Duration;

    fn synced_hours_ago(hours: i64) -> String {
        (Utc::now() - ChronoDuration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn kubeconfig_of(secret: &k8s_openapi::api::core::v1::Secret) -> Option<String> {
        secret
            .data
            .as_ref()
            .and_then(|d| d.get("config"))
            .map(|b| String::from_utf8(b.0.clone()).unwrap())
    }

    fn has_last_sync(secret: &k8s_openapi::api::core::v1::Secret) -> bool {
        secret
            .metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(LAST_SYNC_ANNOTATION))
    }

    #[tokio::test]
    async fn test_missing_secret_is_created() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(harness.secrets.writes(), vec!["create kubeconfig-runtime-1".to_string()]);
        let secret = harness.secrets.get("kubeconfig-runtime-1").unwrap();
        assert_eq!(kubeconfig_of(&secret).as_deref(), Some(TEST_KUBECONFIG));
        assert!(has_last_sync(&secret));

        let labels = secret.metadata.labels.unwrap();
        assert_eq!(labels[CLUSTER_NAME_LABEL], "runtime-1");
        assert_eq!(labels[MANAGED_BY_LABEL], MANAGED_BY_VALUE);
        assert_eq!(labels["kyma-project.io/runtime-id"], "runtime-1");

        let status = harness.clusters.last_status().unwrap();
        assert_eq!(status.state, Some(GardenerClusterState::Ready));
        assert_eq!(status.conditions[0].reason, "KubeconfigSecretCreated");
        assert_eq!(status.conditions[0].status, ConditionStatus::True);
        assert_ne!(action, Action::await_change());
    }

    #[tokio::test]
    async fn test_fresh_secret_is_left_alone() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness.secrets.add(create_test_secret(
            "kubeconfig-runtime-1",
            "runtime-1",
            Some(&synced_hours_ago(1)),
        ));
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert!(harness.secrets.writes().is_empty());
        assert!(harness.clusters.last_status().is_none());
        assert_ne!(action, Action::await_change());
        assert_ne!(action, Action::requeue(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_stale_secret_is_rotated() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness.secrets.add(create_test_secret(
            "kubeconfig-runtime-1",
            "runtime-1",
            Some(&synced_hours_ago(23)),
        ));
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(harness.secrets.writes(), vec!["update kubeconfig-runtime-1".to_string()]);
        let secret = harness.secrets.get("kubeconfig-runtime-1").unwrap();
        assert_eq!(kubeconfig_of(&secret).as_deref(), Some(TEST_KUBECONFIG));

        let status = harness.clusters.last_status().unwrap();
        assert_eq!(status.conditions[0].reason, "KubeconfigSecretRotated");
    }

    #[tokio::test]
    async fn test_secret_without_last_sync_is_rotated() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-1", "runtime-1", None));
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(harness.secrets.writes(), vec!["update kubeconfig-runtime-1".to_string()]);
    }

    #[tokio::test]
    async fn test_two_labelled_secrets_are_ambiguous() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness.secrets.add(create_test_secret("kubeconfig-a", "runtime-1", None));
        harness.secrets.add(create_test_secret("kubeconfig-b", "runtime-1", None));
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        let result = harness.reconciler.reconcile_gardener_cluster(&cluster).await;

        assert!(matches!(result, Err(ControllerError::AmbiguousSecret(_))));
        assert!(harness.secrets.writes().is_empty());
        let status = harness.clusters.last_status().unwrap();
        assert_eq!(status.state, Some(GardenerClusterState::Error));
        assert_eq!(status.conditions[0].reason, "FailedToGetSecret");
    }

    #[tokio::test]
    async fn test_forced_rotation_strips_then_reissues() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness.secrets.add(create_test_secret(
            "kubeconfig-runtime-1",
            "runtime-1",
            Some(&synced_hours_ago(1)),
        ));
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        force_rotation(&mut cluster);

        harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(harness.clusters.removals(), 1);
        assert_eq!(
            harness.secrets.writes(),
            vec![
                "update kubeconfig-runtime-1".to_string(),
                "update kubeconfig-runtime-1".to_string()
            ]
        );

        let stripped = harness.secrets.written(0);
        assert!(kubeconfig_of(&stripped).is_none());
        assert!(!has_last_sync(&stripped));

        let reissued = harness.secrets.get("kubeconfig-runtime-1").unwrap();
        assert_eq!(kubeconfig_of(&reissued).as_deref(), Some(TEST_KUBECONFIG));
        assert!(has_last_sync(&reissued));

        // a single Ready write once the new kubeconfig is in place
        assert_eq!(harness.clusters.statuses.lock().unwrap().len(), 1);
        assert_eq!(
            harness.clusters.last_status().unwrap().conditions[0].reason,
            "KubeconfigSecretRotated"
        );
    }

    #[tokio::test]
    async fn test_missing_shoot_stops_without_requeue() {
        let harness = create_test_reconciler();
        let cluster = create_test_gardener_cluster("runtime-1", "c-missing");

        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(harness.secrets.writes().is_empty());
        let status = harness.clusters.last_status().unwrap();
        assert_eq!(status.state, Some(GardenerClusterState::Error));
        assert_eq!(status.conditions[0].reason, "FailedToGetKubeconfig");
    }

    #[tokio::test]
    async fn test_kubeconfig_request_failure_is_retried() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        harness.gardener.fail(MockOperation::RequestKubeconfig);
        let cluster = create_test_gardener_cluster("runtime-1", "c-123");

        let result = harness.reconciler.reconcile_gardener_cluster(&cluster).await;

        assert!(matches!(result, Err(ControllerError::Gardener(_))));
        assert!(harness.secrets.writes().is_empty());
        assert_eq!(
            harness.clusters.last_status().unwrap().conditions[0].reason,
            "FailedToGetKubeconfig"
        );
    }

    #[tokio::test]
    async fn test_cleanup_deletes_the_labelled_secret() {
        let harness = create_test_reconciler();
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-1", "runtime-1", None));
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-2", "runtime-2", None));

        harness
            .reconciler
            .cleanup_gardener_cluster("kcp-system", "runtime-1")
            .await
            .unwrap();

        assert_eq!(harness.secrets.writes(), vec!["delete kubeconfig-runtime-1".to_string()]);
        assert!(harness.secrets.get("kubeconfig-runtime-2").is_some());
    }

    #[tokio::test]
    async fn test_cleanup_without_secret_is_a_no_op() {
        let harness = create_test_reconciler();

        harness
            .reconciler
            .cleanup_gardener_cluster("kcp-system", "runtime-1")
            .await
            .unwrap();

        assert!(harness.secrets.writes().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_refuses_ambiguous_secrets() {
        let harness = create_test_reconciler();
        harness.secrets.add(create_test_secret("kubeconfig-a", "runtime-1", None));
        harness.secrets.add(create_test_secret("kubeconfig-b", "runtime-1", None));

        let result = harness
            .reconciler
            .cleanup_gardener_cluster("kcp-system", "runtime-1")
            .await;

        assert!(matches!(result, Err(ControllerError::AmbiguousSecret(_))));
        assert!(harness.secrets.writes().is_empty());
    }

    #[tokio::test]
    async fn test_new_cluster_gets_finalizer() {
        let harness = create_test_reconciler();
        harness.gardener.set_kubeconfig("c-123", TEST_KUBECONFIG);
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        cluster.metadata.finalizers = None;

        harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(harness.clusters.finalizers_added(), 1);
        assert_eq!(harness.secrets.writes(), vec!["create kubeconfig-runtime-1".to_string()]);

        let cluster = create_test_gardener_cluster("runtime-1", "c-123");
        harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();
        assert_eq!(harness.clusters.finalizers_added(), 1);
    }

    #[tokio::test]
    async fn test_deleted_cluster_removes_secret_then_finalizer() {
        let harness = create_test_reconciler();
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-1", "runtime-1", None));
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        mark_deleted(&mut cluster);

        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(harness.secrets.writes(), vec!["delete kubeconfig-runtime-1".to_string()]);
        assert_eq!(harness.clusters.finalizers_removed(), 1);
        assert_eq!(harness.clusters.finalizers_added(), 0);
    }

    #[tokio::test]
    async fn test_failed_secret_delete_keeps_finalizer_until_retry_succeeds() {
        let harness = create_test_reconciler();
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-1", "runtime-1", None));
        harness.secrets.fail_deletes(1);
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        mark_deleted(&mut cluster);

        let result = harness.reconciler.reconcile_gardener_cluster(&cluster).await;

        assert!(result.is_err());
        assert!(harness.secrets.get("kubeconfig-runtime-1").is_some());
        assert_eq!(harness.clusters.finalizers_removed(), 0);

        // the error policy requeues the same object
        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(harness.secrets.get("kubeconfig-runtime-1").is_none());
        assert_eq!(harness.clusters.finalizers_removed(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_secrets_block_finalizer_removal() {
        let harness = create_test_reconciler();
        harness.secrets.add(create_test_secret("kubeconfig-a", "runtime-1", None));
        harness.secrets.add(create_test_secret("kubeconfig-b", "runtime-1", None));
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        mark_deleted(&mut cluster);

        let result = harness.reconciler.reconcile_gardener_cluster(&cluster).await;

        assert!(matches!(result, Err(ControllerError::AmbiguousSecret(_))));
        assert!(harness.secrets.writes().is_empty());
        assert_eq!(harness.clusters.finalizers_removed(), 0);
    }

    #[tokio::test]
    async fn test_deleted_cluster_without_finalizer_is_left_alone() {
        let harness = create_test_reconciler();
        harness
            .secrets
            .add(create_test_secret("kubeconfig-runtime-1", "runtime-1", None));
        let mut cluster = create_test_gardener_cluster("runtime-1", "c-123");
        cluster.metadata.finalizers = None;
        mark_deleted(&mut cluster);

        let action = harness.reconciler.reconcile_gardener_cluster(&cluster).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(harness.secrets.writes().is_empty());
        assert_eq!(harness.clusters.finalizers_removed(), 0);
    }
}
