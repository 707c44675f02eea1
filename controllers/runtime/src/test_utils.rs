//! Test utilities for unit testing the Runtime reconciler
//!
//! Fixtures for Runtimes and Shoots plus in-memory stand-ins for the status
//! store and metrics.

#[cfg(test)]
use crate::error::ControllerError;
#[cfg(test)]
use crate::metrics::{Metrics, ReconcileResult};
#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use crate::store::RuntimeStore;
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use crds::{RUNTIME_FINALIZER, Runtime, RuntimeStatus};
#[cfg(test)]
use gardener_client::{
    LastOperation, LastOperationState, LastOperationType, MockGardenerClient, RUNTIME_GENERATION_ANNOTATION, Shoot,
    ShootStatus,
};
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use shoot_converter::{AuditLogData, AuditLogDataSource, AuditLogError, Converter, ConverterConfig, CreateOpts};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
pub const TEST_NAMESPACE: &str = "garden-kyma";

#[cfg(test)]
pub const TEST_REQUEUE: Duration = Duration::from_secs(15);

/// Helper to create a valid Runtime carrying every required label and the finalizer
#[cfg(test)]
pub fn create_test_runtime(provider: &str, region: &str, purpose: &str) -> Runtime {
    serde_json::from_value(json!({
        "apiVersion": "infrastructuremanager.kyma-project.io/v1",
        "kind": "Runtime",
        "metadata": {
            "name": "runtime-1",
            "namespace": "kcp-system",
            "generation": 2,
            "resourceVersion": "100",
            "finalizers": [RUNTIME_FINALIZER],
            "labels": {
                "kyma-project.io/instance-id": "instance-1",
                "kyma-project.io/runtime-id": "runtime-1",
                "kyma-project.io/broker-plan-id": "plan-1",
                "kyma-project.io/broker-plan-name": "aws",
                "kyma-project.io/global-account-id": "ga-1",
                "kyma-project.io/subaccount-id": "sa-1",
                "kyma-project.io/shoot-name": "c-1a2b3c",
                "kyma-project.io/region": region,
                "operator.kyma-project.io/kyma-name": "runtime-1",
            }
        },
        "spec": {
            "shoot": {
                "name": "c-1a2b3c",
                "purpose": purpose,
                "region": region,
                "secretBindingName": "sb-test",
                "kubernetes": {"version": "1.29"},
                "provider": {
                    "type": provider,
                    "workers": [{
                        "name": "cpu-worker-0",
                        "machine": {"type": "m6i.large"},
                        "minimum": 1,
                        "maximum": 3,
                        "zones": [format!("{region}a")],
                    }]
                },
                "networking": {
                    "pods": "100.64.0.0/12",
                    "nodes": "10.250.0.0/16",
                    "services": "100.104.0.0/13",
                }
            }
        }
    }))
    .unwrap()
}

/// Helper to create the Shoot Gardener would hold for `runtime`, reporting
/// the given last operation
#[cfg(test)]
pub fn create_test_shoot(runtime: &Runtime, operation: LastOperationType, state: LastOperationState) -> Shoot {
    let opts = CreateOpts {
        namespace: TEST_NAMESPACE.to_string(),
        ..Default::default()
    };
    let mut shoot = Converter::for_create(&ConverterConfig::default(), opts)
        .to_shoot(runtime)
        .unwrap();

    shoot.metadata.resource_version = Some("1".to_string());
    shoot.metadata.annotations.get_or_insert_with(Default::default).insert(
        RUNTIME_GENERATION_ANNOTATION.to_string(),
        runtime.metadata.generation.unwrap_or(0).to_string(),
    );
    shoot.status = Some(ShootStatus {
        last_operation: Some(LastOperation {
            type_: operation,
            state,
            description: String::new(),
            progress: 100,
        }),
        observed_generation: Some(1),
    });
    shoot
}

#[cfg(test)]
pub fn create_test_audit_data() -> AuditLogData {
    AuditLogData {
        tenant_id: "tenant-1".to_string(),
        service_url: "https://auditlog.example.com:3001".to_string(),
        secret_name: "auditlog-secret".to_string(),
    }
}

/// Audit log source answering every lookup the same way
#[cfg(test)]
pub struct StaticAuditLogSource(pub Option<AuditLogData>);

#[cfg(test)]
impl AuditLogDataSource for StaticAuditLogSource {
    fn lookup(&self, provider: &str, region: &str) -> Result<AuditLogData, AuditLogError> {
        self.0.clone().ok_or_else(|| AuditLogError::RegionNotFound {
            provider: provider.to_string(),
            region: region.to_string(),
        })
    }
}

/// Records every write the reconciler makes to a Runtime
#[cfg(test)]
#[derive(Clone, Default)]
pub struct InMemoryRuntimeStore {
    pub statuses: Arc<Mutex<Vec<RuntimeStatus>>>,
    pub finalizers_added: Arc<AtomicUsize>,
    pub finalizers_removed: Arc<AtomicUsize>,
}

#[cfg(test)]
impl InMemoryRuntimeStore {
    pub fn last_status(&self) -> Option<RuntimeStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn status_writes(&self) -> usize {
        self.statuses.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl RuntimeStore for InMemoryRuntimeStore {
    async fn update_status(&self, _runtime: &Runtime, status: &RuntimeStatus) -> Result<(), ControllerError> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }

    async fn add_finalizer(&self, _runtime: &Runtime) -> Result<(), ControllerError> {
        self.finalizers_added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_finalizer(&self, _runtime: &Runtime) -> Result<(), ControllerError> {
        self.finalizers_removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts metric events instead of exporting them
#[cfg(test)]
#[derive(Default)]
pub struct CountingMetrics {
    pub stops: AtomicUsize,
    pub results: Mutex<Vec<ReconcileResult>>,
}

#[cfg(test)]
impl CountingMetrics {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Metrics for CountingMetrics {
    fn fsm_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn reconciliation(&self, result: ReconcileResult) {
        self.results.lock().unwrap().push(result);
    }
}

/// Reconciler wired to a mock Gardener, an in-memory store and counting metrics
#[cfg(test)]
pub struct TestHarness {
    pub gardener: MockGardenerClient,
    pub store: InMemoryRuntimeStore,
    pub metrics: Arc<CountingMetrics>,
    pub reconciler: Reconciler,
}

/// Helper to create a reconciler for tests
#[cfg(test)]
pub fn create_test_reconciler(audit_log: Option<AuditLogData>, audit_log_mandatory: bool) -> TestHarness {
    let gardener = MockGardenerClient::new(TEST_NAMESPACE);
    let store = InMemoryRuntimeStore::default();
    let metrics = Arc::new(CountingMetrics::default());

    let mut config = ConverterConfig::default();
    config.audit_log.policy_config_map_name = "audit-policy".to_string();

    let reconciler = Reconciler::new(
        Box::new(gardener.clone()),
        Box::new(store.clone()),
        metrics.clone(),
        Some(Box::new(StaticAuditLogSource(audit_log))),
        None,
        config,
        audit_log_mandatory,
        TEST_REQUEUE,
    );

    TestHarness {
        gardener,
        store,
        metrics,
        reconciler,
    }
}
