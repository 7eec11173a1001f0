//! # Apply Tests
//!
//! `ensure` against the in-memory store: idempotence, label merging and
//! proxy settings layered onto live objects that carry foreign fields.

mod common;

use common::{image_environment, reconciler, InMemoryObjectStore};
use external_secrets_operator::config::OperandEnvironment;
use external_secrets_operator::constants::{TRUSTED_CA_BUNDLE_CONFIGMAP, TRUSTED_CA_BUNDLE_VOLUME};
use external_secrets_operator::controller::reconciler::desired::{self, OperandAssets};
use external_secrets_operator::controller::reconciler::{ensure, reconcile_pass, EnsureOutcome};
use external_secrets_operator::crd::{
    ExternalSecretsConfigSpec, ExternalSecretsManager, ExternalSecretsManagerSpec, GlobalConfig,
    ProxyConfig,
};
use external_secrets_operator::store::{ManagedObject, ObjectKey, ObjectKind};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, EnvVar, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

fn controller_key() -> ObjectKey {
    ObjectKey::new(ObjectKind::Deployment, "external-secrets", "external-secrets")
}

fn desired_controller(proxy: Option<&ProxyConfig>) -> ManagedObject {
    let assets = OperandAssets::load().unwrap();
    let environment = OperandEnvironment {
        external_secrets_image: Some(common::TEST_IMAGE.to_string()),
        ..Default::default()
    };
    let state = desired::build(
        &ExternalSecretsConfigSpec::default(),
        &BTreeMap::new(),
        proxy,
        &environment,
        &assets,
    )
    .unwrap();
    state
        .objects
        .into_iter()
        .find(|o| o.key() == controller_key())
        .unwrap()
}

fn deployment(object: &ManagedObject) -> &Deployment {
    match object {
        ManagedObject::Deployment(d) => d,
        ManagedObject::ConfigMap(_) => panic!("expected a deployment"),
    }
}

fn set_cpu_limit(object: &mut ManagedObject, cpu: &str) {
    let ManagedObject::Deployment(d) = object else {
        panic!("expected a deployment");
    };
    let pod = d.spec.as_mut().unwrap().template.spec.as_mut().unwrap();
    pod.containers[0].resources = Some(ResourceRequirements {
        limits: Some(BTreeMap::from([("cpu".to_string(), Quantity(cpu.to_string()))])),
        ..Default::default()
    });
}

fn env_of(object: &ManagedObject) -> Vec<(String, Option<String>)> {
    let pod = deployment(object)
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();
    pod.containers[0]
        .env
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|e| (e.name, e.value))
        .collect()
}

#[tokio::test]
async fn test_second_ensure_makes_no_writes() {
    let store = InMemoryObjectStore::default();
    let desired = desired_controller(None);

    assert_eq!(ensure(&store, &desired).await.unwrap(), EnsureOutcome::Created);
    store.reset_counts();
    assert_eq!(ensure(&store, &desired).await.unwrap(), EnsureOutcome::Unchanged);
    assert_eq!(store.counts().objects(), 0);
}

#[tokio::test]
async fn test_canonicalized_resources_are_unchanged() {
    let store = InMemoryObjectStore::default();
    let mut desired = desired_controller(None);
    let mut live = desired.clone();
    set_cpu_limit(&mut desired, "1000m");
    // the API server hands back the canonical form
    set_cpu_limit(&mut live, "1");
    store.insert(live);
    store.reset_counts();

    assert_eq!(ensure(&store, &desired).await.unwrap(), EnsureOutcome::Unchanged);
    assert_eq!(store.counts().objects(), 0);
}

#[tokio::test]
async fn test_label_merge_never_clobbers() {
    let store = InMemoryObjectStore::default();
    let mut live = ConfigMap {
        metadata: ObjectMeta {
            name: Some("bundle".to_string()),
            namespace: Some("external-secrets".to_string()),
            labels: Some(BTreeMap::from([("a".to_string(), "1".to_string())])),
            ..Default::default()
        },
        ..Default::default()
    };
    store.insert(ManagedObject::ConfigMap(live.clone()));

    live.metadata.labels = Some(BTreeMap::from([("b".to_string(), "2".to_string())]));
    let desired = ManagedObject::ConfigMap(live);

    assert_eq!(ensure(&store, &desired).await.unwrap(), EnsureOutcome::Updated);
    let stored = store.object(&desired.key()).unwrap();
    assert_eq!(
        stored.metadata().labels,
        Some(BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]))
    );

    store.reset_counts();
    assert_eq!(ensure(&store, &desired).await.unwrap(), EnsureOutcome::Unchanged);
    assert_eq!(store.counts().updates, 0);
}

#[tokio::test]
async fn test_proxy_env_is_added_without_disturbing_existing_vars() {
    let store = InMemoryObjectStore::default();
    let mut live = desired_controller(None);
    if let ManagedObject::Deployment(d) = &mut live {
        let pod = d.spec.as_mut().unwrap().template.spec.as_mut().unwrap();
        pod.containers[0].env = Some(vec![EnvVar {
            name: "GOMAXPROCS".to_string(),
            value: Some("2".to_string()),
            ..Default::default()
        }]);
    }
    store.insert(live);

    let proxy = ProxyConfig {
        http_proxy: "http://x:3128".to_string(),
        ..Default::default()
    };
    assert_eq!(
        ensure(&store, &desired_controller(Some(&proxy))).await.unwrap(),
        EnsureOutcome::Updated
    );

    let stored = store.object(&controller_key()).unwrap();
    assert_eq!(
        env_of(&stored),
        vec![
            ("GOMAXPROCS".to_string(), Some("2".to_string())),
            ("HTTP_PROXY".to_string(), Some("http://x:3128".to_string())),
            ("http_proxy".to_string(), Some("http://x:3128".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_no_proxy_leaves_existing_proxy_vars_alone() {
    let store = InMemoryObjectStore::default();
    let proxy = ProxyConfig {
        http_proxy: "http://x:3128".to_string(),
        ..Default::default()
    };
    store.insert(desired_controller(Some(&proxy)));
    store.reset_counts();

    assert_eq!(
        ensure(&store, &desired_controller(None)).await.unwrap(),
        EnsureOutcome::Unchanged
    );
    let stored = store.object(&controller_key()).unwrap();
    assert_eq!(env_of(&stored).len(), 2);
}

#[tokio::test]
async fn test_global_proxy_installs_trusted_ca_bundle() {
    let store = Arc::new(InMemoryObjectStore::with_config(
        ExternalSecretsConfigSpec::default(),
    ));
    store.set_manager(ExternalSecretsManager::new(
        "cluster",
        ExternalSecretsManagerSpec {
            global_config: Some(GlobalConfig {
                labels: Some(BTreeMap::from([("team".to_string(), "platform".to_string())])),
                proxy: Some(ProxyConfig {
                    https_proxy: "http://global:3128".to_string(),
                    ..Default::default()
                }),
            }),
        },
    ));
    let ctx = reconciler(&store, image_environment());

    reconcile_pass("cluster", &ctx).await.unwrap();

    let bundle = store
        .object(&ObjectKey::new(
            ObjectKind::ConfigMap,
            "external-secrets",
            TRUSTED_CA_BUNDLE_CONFIGMAP,
        ))
        .unwrap();
    assert_eq!(bundle.metadata().labels.as_ref().unwrap()["team"], "platform");

    let controller = store.object(&controller_key()).unwrap();
    assert!(env_of(&controller)
        .contains(&("HTTPS_PROXY".to_string(), Some("http://global:3128".to_string()))));
    let pod = deployment(&controller)
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();
    let volumes = pod.volumes.as_ref().unwrap();
    assert_eq!(
        volumes
            .iter()
            .filter(|v| v.name == TRUSTED_CA_BUNDLE_VOLUME)
            .count(),
        1
    );
}
