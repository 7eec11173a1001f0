//! Common test utilities
//!
//! An in-memory [`ObjectStore`] with API-server-like resource versions, plus
//! fixtures for building a reconciler against it.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use async_trait::async_trait;
use external_secrets_operator::config::{ControllerConfig, StaticEnvironment};
use external_secrets_operator::constants::{EXTERNAL_SECRETS_IMAGE_ENV, SINGLETON_NAME};
use external_secrets_operator::controller::reconciler::Reconciler;
use external_secrets_operator::crd::{
    ExternalSecretsConfig, ExternalSecretsConfigSpec, ExternalSecretsManager,
};
use external_secrets_operator::store::{ManagedObject, ObjectKey, ObjectStore, StoreError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const TEST_IMAGE: &str = "registry.example.com/external-secrets:v0.10.0";

/// Calls that reached the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub creates: u32,
    pub updates: u32,
    pub status_attempts: u32,
    pub status_writes: u32,
}

impl WriteCounts {
    /// Object writes, excluding status
    pub fn objects(&self) -> u32 {
        self.creates + self.updates
    }
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectKey, ManagedObject>,
    config: Option<ExternalSecretsConfig>,
    manager: Option<ExternalSecretsManager>,
    kinds: BTreeMap<String, Vec<String>>,
    version: u64,
    counts: WriteCounts,
    update_conflicts: u32,
    status_conflicts: u32,
    reject_with: Option<String>,
    fail_status: bool,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// Store that behaves like the API server for the calls the operator makes
///
/// Writes carrying a stale `resourceVersion` fail with `Conflict`, and status
/// writes are applied as a merge patch. Conflicts, rejections and status
/// failures can be scripted.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
}

impl InMemoryObjectStore {
    pub fn with_config(spec: ExternalSecretsConfigSpec) -> Self {
        let store = Self::default();
        store.set_config(spec);
        store
    }

    /// Replace the config spec, keeping any status already written
    pub fn set_config(&self, spec: ExternalSecretsConfigSpec) {
        let mut state = self.state.lock().unwrap();
        let mut config = ExternalSecretsConfig::new(SINGLETON_NAME, spec);
        config.metadata.generation = Some(1);
        config.status = state.config.as_ref().and_then(|c| c.status.clone());
        config.metadata.resource_version = Some(state.next_version());
        state.config = Some(config);
    }

    pub fn set_manager(&self, manager: ExternalSecretsManager) {
        self.state.lock().unwrap().manager = Some(manager);
    }

    /// Serve `kinds` for `group_version` during capability discovery
    pub fn set_kinds(&self, group_version: &str, kinds: &[&str]) {
        self.state.lock().unwrap().kinds.insert(
            group_version.to_string(),
            kinds.iter().map(|k| k.to_string()).collect(),
        );
    }

    /// Store `object` as if another client had created it
    pub fn insert(&self, mut object: ManagedObject) {
        let mut state = self.state.lock().unwrap();
        object.metadata_mut().resource_version = Some(state.next_version());
        state.objects.insert(object.key(), object);
    }

    /// Fail the next `n` object updates with a conflict, each after a
    /// concurrent write bumps the stored version
    pub fn conflict_next_updates(&self, n: u32) {
        self.state.lock().unwrap().update_conflicts = n;
    }

    pub fn conflict_next_status_writes(&self, n: u32) {
        self.state.lock().unwrap().status_conflicts = n;
    }

    /// Reject every create and update with `message`
    pub fn reject_writes(&self, message: &str) {
        self.state.lock().unwrap().reject_with = Some(message.to_string());
    }

    pub fn fail_status_writes(&self) {
        self.state.lock().unwrap().fail_status = true;
    }

    pub fn object(&self, key: &ObjectKey) -> Option<ManagedObject> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn objects(&self) -> Vec<ManagedObject> {
        self.state.lock().unwrap().objects.values().cloned().collect()
    }

    pub fn config(&self) -> Option<ExternalSecretsConfig> {
        self.state.lock().unwrap().config.clone()
    }

    pub fn counts(&self) -> WriteCounts {
        self.state.lock().unwrap().counts
    }

    pub fn reset_counts(&self) {
        self.state.lock().unwrap().counts = WriteCounts::default();
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        Ok(self.state.lock().unwrap().objects.get(key).cloned())
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let mut state = self.state.lock().unwrap();
        let key = object.key();
        if let Some(message) = &state.reject_with {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                message: message.clone(),
            });
        }
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        state.counts.creates += 1;
        let mut created = object.clone();
        created.metadata_mut().resource_version = Some(state.next_version());
        state.objects.insert(key, created.clone());
        Ok(created)
    }

    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let mut state = self.state.lock().unwrap();
        let key = object.key();
        if let Some(message) = &state.reject_with {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                message: message.clone(),
            });
        }
        if state.update_conflicts > 0 {
            state.update_conflicts -= 1;
            let version = state.next_version();
            if let Some(stored) = state.objects.get_mut(&key) {
                stored.metadata_mut().resource_version = Some(version);
            }
            return Err(StoreError::Conflict {
                key: key.to_string(),
                message: "the object has been modified".to_string(),
            });
        }
        let Some(stored) = state.objects.get(&key) else {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        };
        if stored.resource_version() != object.resource_version() {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                message: "stale resourceVersion".to_string(),
            });
        }
        state.counts.updates += 1;
        let mut updated = object.clone();
        updated.metadata_mut().resource_version = Some(state.next_version());
        state.objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn get_config(&self, name: &str) -> Result<Option<ExternalSecretsConfig>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .config
            .clone()
            .filter(|c| c.metadata.name.as_deref() == Some(name)))
    }

    async fn update_config_status(
        &self,
        config: &ExternalSecretsConfig,
    ) -> Result<ExternalSecretsConfig, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.counts.status_attempts += 1;
        let key = "ExternalSecretsConfig cluster".to_string();
        if state.fail_status {
            return Err(StoreError::Transient {
                operation: "update status".to_string(),
                message: "connection refused".to_string(),
            });
        }
        if state.status_conflicts > 0 {
            state.status_conflicts -= 1;
            let version = state.next_version();
            if let Some(stored) = state.config.as_mut() {
                stored.metadata.resource_version = Some(version);
            }
            return Err(StoreError::Conflict {
                key,
                message: "the object has been modified".to_string(),
            });
        }
        let current = state
            .config
            .as_ref()
            .and_then(|c| c.metadata.resource_version.clone());
        if current != config.metadata.resource_version {
            return Err(StoreError::Conflict {
                key,
                message: "stale resourceVersion".to_string(),
            });
        }
        let version = state.next_version();
        state.counts.status_writes += 1;
        let Some(stored) = state.config.as_mut() else {
            return Err(StoreError::NotFound { key });
        };
        let mut status = serde_json::to_value(&stored.status).unwrap();
        merge_patch(&mut status, &serde_json::to_value(&config.status).unwrap());
        stored.status = serde_json::from_value(status).unwrap();
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn get_manager(&self, name: &str) -> Result<Option<ExternalSecretsManager>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .manager
            .clone()
            .filter(|m| m.metadata.name.as_deref() == Some(name)))
    }

    async fn list_kinds(&self, group_version: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .kinds
            .get(group_version)
            .cloned()
            .unwrap_or_default())
    }
}

/// JSON merge patch: objects merge key by key, `null` removes a key, and
/// anything else replaces the target
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        for (key, value) in entries {
            if value.is_null() {
                fields.remove(key);
            } else {
                merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Controller config with millisecond retry delays
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        status_retry_initial_ms: 1,
        apply_retry_initial_ms: 1,
        reconcile_timeout_secs: 10,
        ..ControllerConfig::default()
    }
}

/// Environment with the operand image set
pub fn image_environment() -> StaticEnvironment {
    StaticEnvironment::default().with(EXTERNAL_SECRETS_IMAGE_ENV, TEST_IMAGE)
}

pub fn reconciler(store: &Arc<InMemoryObjectStore>, environment: StaticEnvironment) -> Reconciler {
    Reconciler::new(store.clone(), Arc::new(environment), fast_config()).unwrap()
}
