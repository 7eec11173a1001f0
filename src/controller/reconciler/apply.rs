//! # Diff and Apply
//!
//! Ensures one desired object exists in the cluster with its managed fields
//! matching. The live object is the base: only the fields the operator owns
//! are overwritten, so defaults filled in by the API server and fields set by
//! other controllers survive, and a converged object produces no write.
//!
//! Managed fields of a Deployment:
//!
//! - metadata labels (desired keys are merged over live ones)
//! - replicas, and the selector when the live object has none
//! - pod template labels (merged)
//! - service account, node selector, affinity and tolerations (replaced)
//! - volumes, matched by name
//! - per container (matched by name): image, args, resources (compared by
//!   quantity value), env entries and volume mounts named by the desired
//!   container
//!
//! Only labels are managed on ConfigMaps; their data belongs to the CA
//! bundle injector.

use crate::controller::reconciler::quantity::resources_equal;
use crate::store::{ManagedObject, ObjectStore, StoreError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Container, PodSpec, Volume};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What `ensure` did to the live object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Updated,
    Unchanged,
}

impl EnsureOutcome {
    /// Whether a write was issued
    pub fn applied(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Create `desired` if missing, or update the live object when a managed
/// field differs.
///
/// Call again from a fresh read when this returns a conflict.
pub async fn ensure(
    store: &dyn ObjectStore,
    desired: &ManagedObject,
) -> Result<EnsureOutcome, StoreError> {
    let key = desired.key();

    let Some(live) = store.get(&key).await? else {
        store.create(desired).await?;
        info!(object = %key, "created");
        return Ok(EnsureOutcome::Created);
    };

    let merged = merge_managed(&live, desired);
    if merged == live {
        debug!(object = %key, "up to date");
        return Ok(EnsureOutcome::Unchanged);
    }

    store.update(&merged).await?;
    info!(object = %key, "updated");
    Ok(EnsureOutcome::Updated)
}

/// Overlay the managed fields of `desired` onto `live`
///
/// The result keeps `live`'s resource version, so writing it back is
/// rejected if another writer got there first. Objects of different kinds
/// never merge; `desired` is returned as is.
pub fn merge_managed(live: &ManagedObject, desired: &ManagedObject) -> ManagedObject {
    match (live, desired) {
        (ManagedObject::Deployment(live), ManagedObject::Deployment(desired)) => {
            ManagedObject::Deployment(merge_deployment(live, desired))
        }
        (ManagedObject::ConfigMap(live), ManagedObject::ConfigMap(desired)) => {
            ManagedObject::ConfigMap(merge_config_map(live, desired))
        }
        _ => desired.clone(),
    }
}

fn merge_config_map(live: &ConfigMap, desired: &ConfigMap) -> ConfigMap {
    let mut merged = live.clone();
    merge_meta_labels(&mut merged.metadata, &desired.metadata);
    merged
}

fn merge_deployment(live: &Deployment, desired: &Deployment) -> Deployment {
    let mut merged = live.clone();
    merge_meta_labels(&mut merged.metadata, &desired.metadata);

    let Some(desired_spec) = &desired.spec else {
        return merged;
    };
    let spec = merged.spec.get_or_insert_with(Default::default);

    spec.replicas = desired_spec.replicas;
    // selectors are immutable once set
    let selector_empty = spec
        .selector
        .match_labels
        .as_ref()
        .map_or(true, BTreeMap::is_empty)
        && spec
            .selector
            .match_expressions
            .as_ref()
            .map_or(true, Vec::is_empty);
    if selector_empty {
        spec.selector = desired_spec.selector.clone();
    }

    if let Some(desired_meta) = &desired_spec.template.metadata {
        let meta = spec.template.metadata.get_or_insert_with(Default::default);
        merge_meta_labels(meta, desired_meta);
    }
    if let Some(desired_pod) = &desired_spec.template.spec {
        let pod = spec.template.spec.get_or_insert_with(Default::default);
        merge_pod_spec(pod, desired_pod);
    }

    merged
}

fn merge_meta_labels(live: &mut ObjectMeta, desired: &ObjectMeta) {
    if let Some(labels) = &desired.labels {
        live.labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

fn merge_pod_spec(live: &mut PodSpec, desired: &PodSpec) {
    live.service_account_name.clone_from(&desired.service_account_name);
    live.node_selector.clone_from(&desired.node_selector);
    live.affinity.clone_from(&desired.affinity);
    live.tolerations.clone_from(&desired.tolerations);

    if let Some(volumes) = &desired.volumes {
        let live_volumes = live.volumes.get_or_insert_with(Vec::new);
        for volume in volumes {
            merge_volume(live_volumes, volume);
        }
    }

    merge_containers(&mut live.containers, &desired.containers);
    if let Some(init) = &desired.init_containers {
        merge_containers(live.init_containers.get_or_insert_with(Vec::new), init);
    }
}

/// The parts of a volume the operator sets: name, source kind and the
/// referenced object. Server-defaulted fields such as `defaultMode` are ignored.
fn volume_signature(volume: &Volume) -> (&str, &'static str, Option<&str>) {
    let source = if let Some(cm) = &volume.config_map {
        ("configMap", Some(cm.name.as_str()))
    } else if let Some(secret) = &volume.secret {
        ("secret", secret.secret_name.as_deref())
    } else if volume.empty_dir.is_some() {
        ("emptyDir", None)
    } else {
        ("other", None)
    };
    (volume.name.as_str(), source.0, source.1)
}

fn merge_volume(live: &mut Vec<Volume>, desired: &Volume) {
    match live.iter_mut().find(|v| v.name == desired.name) {
        Some(existing) if volume_signature(existing) == volume_signature(desired) => {}
        Some(existing) => *existing = desired.clone(),
        None => live.push(desired.clone()),
    }
}

fn merge_containers(live: &mut Vec<Container>, desired: &[Container]) {
    for container in desired {
        match live.iter_mut().find(|c| c.name == container.name) {
            Some(existing) => merge_container(existing, container),
            None => live.push(container.clone()),
        }
    }
}

fn merge_container(live: &mut Container, desired: &Container) {
    live.image.clone_from(&desired.image);
    live.args.clone_from(&desired.args);
    if !resources_equal(live.resources.as_ref(), desired.resources.as_ref()) {
        live.resources.clone_from(&desired.resources);
    }

    if let Some(env) = &desired.env {
        let live_env = live.env.get_or_insert_with(Vec::new);
        for var in env {
            match live_env.iter_mut().find(|e| e.name == var.name) {
                Some(existing) if existing == var => {}
                Some(existing) => *existing = var.clone(),
                None => live_env.push(var.clone()),
            }
        }
    }

    if let Some(mounts) = &desired.volume_mounts {
        let live_mounts = live.volume_mounts.get_or_insert_with(Vec::new);
        for mount in mounts {
            match live_mounts.iter_mut().find(|m| m.name == mount.name) {
                Some(existing)
                    if existing.mount_path == mount.mount_path
                        && existing.read_only.unwrap_or(false)
                            == mount.read_only.unwrap_or(false) => {}
                Some(existing) => *existing = mount.clone(),
                None => live_mounts.push(mount.clone()),
            }
        }
    }
}
