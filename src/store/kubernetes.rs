//! # Kubernetes Object Store
//!
//! [`ObjectStore`] backed by the API server. Every call is bounded by the
//! configured API timeout; API status codes are mapped onto [`StoreError`].

use crate::constants::FIELD_MANAGER;
use crate::crd::{ExternalSecretsConfig, ExternalSecretsManager};
use crate::observability;
use crate::store::{ManagedObject, ObjectKey, ObjectKind, ObjectStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for KubeObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KubeObjectStore {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }

    /// Run one API call under the per-call deadline
    async fn call<T, F>(&self, operation: &str, key: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| map_kube_error(operation, key, e)),
            Err(_elapsed) => Err(StoreError::Timeout {
                operation: format!("{operation} {key}"),
                timeout: self.timeout,
            }),
        }
    }
}

/// Classify a kube client error
fn map_kube_error(operation: &str, key: &str, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(e) if e.code == 404 => StoreError::NotFound {
            key: key.to_string(),
        },
        kube::Error::Api(e) if e.code == 409 && e.reason == "AlreadyExists" => {
            StoreError::AlreadyExists {
                key: key.to_string(),
            }
        }
        kube::Error::Api(e) if e.code == 409 => StoreError::Conflict {
            key: key.to_string(),
            message: e.message,
        },
        kube::Error::Api(e) if e.code == 400 || e.code == 422 => StoreError::Rejected {
            key: key.to_string(),
            message: e.message,
        },
        other => StoreError::Transient {
            operation: format!("{operation} {key}"),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        let id = key.to_string();
        let object = match key.kind {
            ObjectKind::Deployment => self
                .call("get", &id, self.deployments(&key.namespace).get_opt(&key.name))
                .await?
                .map(ManagedObject::Deployment),
            ObjectKind::ConfigMap => self
                .call("get", &id, self.config_maps(&key.namespace).get_opt(&key.name))
                .await?
                .map(ManagedObject::ConfigMap),
        };
        Ok(object)
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = object.key();
        let id = key.to_string();
        let pp = Self::post_params();
        let created = match object {
            ManagedObject::Deployment(d) => ManagedObject::Deployment(
                self.call("create", &id, self.deployments(&key.namespace).create(&pp, d))
                    .await?,
            ),
            ManagedObject::ConfigMap(c) => ManagedObject::ConfigMap(
                self.call("create", &id, self.config_maps(&key.namespace).create(&pp, c))
                    .await?,
            ),
        };
        observability::metrics::increment_object_writes(key.kind.as_str(), "create");
        debug!(object = %id, "created");
        Ok(created)
    }

    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = object.key();
        let id = key.to_string();
        let pp = Self::post_params();
        // replace carries metadata.resourceVersion, so a stale read yields 409
        let updated = match object {
            ManagedObject::Deployment(d) => ManagedObject::Deployment(
                self.call(
                    "update",
                    &id,
                    self.deployments(&key.namespace).replace(&key.name, &pp, d),
                )
                .await?,
            ),
            ManagedObject::ConfigMap(c) => ManagedObject::ConfigMap(
                self.call(
                    "update",
                    &id,
                    self.config_maps(&key.namespace).replace(&key.name, &pp, c),
                )
                .await?,
            ),
        };
        observability::metrics::increment_object_writes(key.kind.as_str(), "update");
        debug!(object = %id, "updated");
        Ok(updated)
    }

    async fn get_config(&self, name: &str) -> Result<Option<ExternalSecretsConfig>, StoreError> {
        let api: Api<ExternalSecretsConfig> = Api::all(self.client.clone());
        self.call("get", &format!("ExternalSecretsConfig {name}"), api.get_opt(name))
            .await
    }

    async fn update_config_status(
        &self,
        config: &ExternalSecretsConfig,
    ) -> Result<ExternalSecretsConfig, StoreError> {
        let name = config.metadata.name.clone().unwrap_or_default();
        let id = format!("ExternalSecretsConfig {name}");
        let api: Api<ExternalSecretsConfig> = Api::all(self.client.clone());

        let patch = status_patch(config);
        let pp = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.call(
            "update status",
            &id,
            api.patch_status(&name, &pp, &Patch::Merge(&patch)),
        )
        .await
    }

    async fn get_manager(&self, name: &str) -> Result<Option<ExternalSecretsManager>, StoreError> {
        let api: Api<ExternalSecretsManager> = Api::all(self.client.clone());
        self.call("get", &format!("ExternalSecretsManager {name}"), api.get_opt(name))
            .await
    }

    async fn list_kinds(&self, group_version: &str) -> Result<Vec<String>, StoreError> {
        match self
            .call(
                "discover",
                group_version,
                self.client.list_api_group_resources(group_version),
            )
            .await
        {
            Ok(list) => Ok(list.resources.into_iter().map(|r| r.name).collect()),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Merge patch body for the status subresource
///
/// `resourceVersion` in a merge patch is a precondition, not a field update.
/// Cleared status fields are sent as `null`, which removes them.
fn status_patch(config: &ExternalSecretsConfig) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": config.metadata.resource_version },
        "status": config.status,
    })
}
