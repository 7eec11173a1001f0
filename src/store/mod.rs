//! # Object Store
//!
//! The reconciler talks to the API server only through [`ObjectStore`]. Every
//! write carries the resource version it was computed from, so concurrent
//! writers surface as [`StoreError::Conflict`] rather than silently winning.
//!
//! - [`ManagedObject`] - tagged union of the kinds the operator writes
//! - [`ObjectKey`] - kind, namespace and name of a managed object
//! - [`KubeObjectStore`] - production implementation over `kube::Api`

pub mod kubernetes;

use crate::crd::{ExternalSecretsConfig, ExternalSecretsManager};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use kubernetes::KubeObjectStore;

/// Kinds of objects the operator creates and updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Deployment,
    ConfigMap,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::ConfigMap => "ConfigMap",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a managed object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: ObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// An object whose managed fields the operator owns
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedObject {
    Deployment(Deployment),
    ConfigMap(ConfigMap),
}

impl ManagedObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Deployment(_) => ObjectKind::Deployment,
            Self::ConfigMap(_) => ObjectKind::ConfigMap,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(d) => &d.metadata,
            Self::ConfigMap(c) => &c.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Deployment(d) => &mut d.metadata,
            Self::ConfigMap(c) => &mut c.metadata,
        }
    }

    pub fn key(&self) -> ObjectKey {
        let meta = self.metadata();
        ObjectKey::new(
            self.kind(),
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        )
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }
}

/// Errors returned by an [`ObjectStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{key} not found")]
    NotFound { key: String },

    /// The write carried a stale resource version
    #[error("conflict writing {key}: {message}")]
    Conflict { key: String, message: String },

    /// A create raced with another writer
    #[error("{key} already exists")]
    AlreadyExists { key: String },

    /// The API server refused the object; `message` is its verbatim response
    #[error("{key} rejected: {message}")]
    Rejected { key: String, message: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("{operation} failed: {message}")]
    Transient { operation: String, message: String },

    #[error("failed to encode {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Conflict-class errors are resolved by re-reading and retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::AlreadyExists { .. })
    }
}

/// Authoritative storage for the operator's inputs and outputs
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Read a managed object; `Ok(None)` when it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError>;

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError>;

    /// Replace an object; fails with `Conflict` unless its resource version is current
    async fn update(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError>;

    async fn get_config(&self, name: &str) -> Result<Option<ExternalSecretsConfig>, StoreError>;

    /// Write `config.status`, guarded by `config.metadata.resourceVersion`
    async fn update_config_status(
        &self,
        config: &ExternalSecretsConfig,
    ) -> Result<ExternalSecretsConfig, StoreError>;

    async fn get_manager(&self, name: &str) -> Result<Option<ExternalSecretsManager>, StoreError>;

    /// Plural resource names served for `group_version`; empty when the group is absent
    async fn list_kinds(&self, group_version: &str) -> Result<Vec<String>, StoreError>;
}
