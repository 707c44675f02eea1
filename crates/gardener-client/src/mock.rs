//! Mock GardenerClient for unit testing
//!
//! Stores Shoots and Seeds in memory, counts mutating calls and can be told
//! to fail specific operations.

use crate::error::GardenerError;
use crate::gardener_trait::GardenerClientTrait;
use crate::models::{LastOperation, LastOperationState, LastOperationType, Seed, Shoot, ShootStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Current time as a Kubernetes timestamp.
pub fn now_timestamp() -> Result<Time, GardenerError> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    Ok(serde_json::from_value(serde_json::Value::String(now))?)
}

/// Operations whose failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetShoot,
    CreateShoot,
    UpdateShoot,
    AnnotateShoot,
    DeleteShoot,
    ListSeeds,
    RequestKubeconfig,
}

/// Mock GardenerClient for testing
#[derive(Clone, Debug)]
pub struct MockGardenerClient {
    namespace: String,
    shoots: Arc<Mutex<HashMap<String, Shoot>>>,
    seeds: Arc<Mutex<Vec<Seed>>>,
    kubeconfigs: Arc<Mutex<HashMap<String, String>>>,
    failures: Arc<Mutex<HashSet<MockOperation>>>,
    calls: Arc<Mutex<HashMap<MockOperation, usize>>>,
    concurrent_writes: Arc<Mutex<HashSet<String>>>,
    next_version: Arc<Mutex<u64>>,
}

impl MockGardenerClient {
    /// Create a new mock client for the given project namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            shoots: Arc::new(Mutex::new(HashMap::new())),
            seeds: Arc::new(Mutex::new(Vec::new())),
            kubeconfigs: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            concurrent_writes: Arc::new(Mutex::new(HashSet::new())),
            next_version: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a Shoot to the mock store (for test setup)
    pub fn add_shoot(&self, shoot: Shoot) {
        let name = shoot.metadata.name.clone().unwrap_or_default();
        self.shoots.lock().unwrap().insert(name, shoot);
    }

    /// Add a Seed to the mock store (for test setup)
    pub fn add_seed(&self, seed: Seed) {
        self.seeds.lock().unwrap().push(seed);
    }

    /// Kubeconfig returned by `request_admin_kubeconfig` for a Shoot
    pub fn set_kubeconfig(&self, shoot_name: &str, kubeconfig: &str) {
        self.kubeconfigs
            .lock()
            .unwrap()
            .insert(shoot_name.to_string(), kubeconfig.to_string());
    }

    /// Set the last operation reported on a stored Shoot
    pub fn set_last_operation(&self, name: &str, type_: LastOperationType, state: LastOperationState) {
        if let Some(shoot) = self.shoots.lock().unwrap().get_mut(name) {
            shoot.status = Some(ShootStatus {
                last_operation: Some(LastOperation {
                    type_,
                    state,
                    description: String::new(),
                    progress: 0,
                }),
                observed_generation: shoot.metadata.generation,
            });
        }
    }

    /// Make every subsequent call of `operation` fail
    pub fn fail(&self, operation: MockOperation) {
        self.failures.lock().unwrap().insert(operation);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: MockOperation) {
        self.failures.lock().unwrap().remove(&operation);
    }

    /// Simulate another writer: every read of the Shoot is followed by a
    /// write that moves its resourceVersion, so the reader's copy is stale
    pub fn write_concurrently(&self, name: &str) {
        self.concurrent_writes.lock().unwrap().insert(name.to_string());
    }

    /// Number of times `operation` was invoked
    pub fn calls(&self, operation: MockOperation) -> usize {
        self.calls.lock().unwrap().get(&operation).copied().unwrap_or(0)
    }

    /// Snapshot of a stored Shoot
    pub fn shoot(&self, name: &str) -> Option<Shoot> {
        self.shoots.lock().unwrap().get(name).cloned()
    }

    fn record(&self, operation: MockOperation) -> Result<(), GardenerError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        if self.failures.lock().unwrap().contains(&operation) {
            return Err(GardenerError::Api(format!("injected failure for {operation:?}")));
        }
        Ok(())
    }

    fn bump_version(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        let current = *version;
        *version += 1;
        current.to_string()
    }
}

#[async_trait::async_trait]
impl GardenerClientTrait for MockGardenerClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_shoot(&self, name: &str) -> Result<Shoot, GardenerError> {
        self.record(MockOperation::GetShoot)?;
        let shoot = self
            .shoot(name)
            .ok_or_else(|| GardenerError::NotFound(format!("shoots \"{name}\" not found")))?;

        if self.concurrent_writes.lock().unwrap().contains(name) {
            let mut version = self.bump_version();
            while Some(&version) == shoot.metadata.resource_version.as_ref() {
                version = self.bump_version();
            }
            if let Some(stored) = self.shoots.lock().unwrap().get_mut(name) {
                stored.metadata.resource_version = Some(version);
            }
        }
        Ok(shoot)
    }

    async fn create_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError> {
        self.record(MockOperation::CreateShoot)?;
        let name = shoot.metadata.name.clone().unwrap_or_default();
        let mut shoots = self.shoots.lock().unwrap();
        if shoots.contains_key(&name) {
            return Err(GardenerError::Conflict(format!("shoots \"{name}\" already exists")));
        }

        let mut created = shoot.clone();
        created.metadata.namespace = Some(self.namespace.clone());
        created.metadata.generation = Some(1);
        created.metadata.resource_version = Some(self.bump_version());
        created.status = Some(ShootStatus {
            last_operation: Some(LastOperation {
                type_: LastOperationType::Create,
                state: LastOperationState::Pending,
                description: String::new(),
                progress: 0,
            }),
            observed_generation: None,
        });
        shoots.insert(name, created.clone());
        Ok(created)
    }

    async fn update_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError> {
        self.record(MockOperation::UpdateShoot)?;
        let name = shoot.metadata.name.clone().unwrap_or_default();
        let mut shoots = self.shoots.lock().unwrap();
        let existing = shoots
            .get(&name)
            .ok_or_else(|| GardenerError::NotFound(format!("shoots \"{name}\" not found")))?;

        if shoot.metadata.resource_version.is_some()
            && shoot.metadata.resource_version != existing.metadata.resource_version
        {
            return Err(GardenerError::Conflict(format!("shoots \"{name}\": object has been modified")));
        }

        let mut updated = shoot.clone();
        updated.status = existing.status.clone();
        updated.metadata.generation = existing.metadata.generation.map(|g| g + 1);
        updated.metadata.resource_version = Some(self.bump_version());
        shoots.insert(name, updated.clone());
        Ok(updated)
    }

    async fn annotate_shoot(&self, name: &str, key: &str, value: &str) -> Result<(), GardenerError> {
        self.record(MockOperation::AnnotateShoot)?;
        let mut shoots = self.shoots.lock().unwrap();
        let shoot = shoots
            .get_mut(name)
            .ok_or_else(|| GardenerError::NotFound(format!("shoots \"{name}\" not found")))?;
        shoot
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_shoot(&self, name: &str) -> Result<(), GardenerError> {
        self.record(MockOperation::DeleteShoot)?;
        let mut shoots = self.shoots.lock().unwrap();
        let shoot = shoots
            .get_mut(name)
            .ok_or_else(|| GardenerError::NotFound(format!("shoots \"{name}\" not found")))?;
        shoot.metadata.deletion_timestamp = Some(now_timestamp()?);
        Ok(())
    }

    async fn list_seeds(&self) -> Result<Vec<Seed>, GardenerError> {
        self.record(MockOperation::ListSeeds)?;
        Ok(self.seeds.lock().unwrap().clone())
    }

    async fn request_admin_kubeconfig(&self, shoot_name: &str, _expiration: Duration) -> Result<String, GardenerError> {
        self.record(MockOperation::RequestKubeconfig)?;
        self.kubeconfigs
            .lock()
            .unwrap()
            .get(shoot_name)
            .cloned()
            .ok_or_else(|| GardenerError::NotFound(format!("shoots \"{shoot_name}\" not found")))
    }
}
