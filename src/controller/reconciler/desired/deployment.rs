//! # Operand Deployments
//!
//! Turns a base manifest plus the effective configuration into the desired
//! Deployment for one operand.

use crate::constants::{
    TRUSTED_CA_BUNDLE_CONFIGMAP, TRUSTED_CA_BUNDLE_MOUNT_PATH, TRUSTED_CA_BUNDLE_VOLUME,
};
use crate::crd::{ApplicationConfig, ProxyConfig};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EnvVar, PodSpec, Volume, VolumeMount,
};
use std::collections::BTreeMap;

const DEFAULT_CERTIFICATE_CHECK_INTERVAL: &str = "5m";
const BITWARDEN_TLS_VOLUME: &str = "bitwarden-tls-certs";

/// The Deployments the operator manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Controller,
    Webhook,
    CertController,
    BitwardenSdkServer,
}

impl Operand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Controller => "external-secrets",
            Self::Webhook => "external-secrets-webhook",
            Self::CertController => "external-secrets-cert-controller",
            Self::BitwardenSdkServer => "bitwarden-sdk-server",
        }
    }
}

/// Everything a Deployment build needs besides its base manifest
#[derive(Debug, Clone, Copy)]
pub struct OperandInputs<'a> {
    pub namespace: &'a str,
    pub labels: &'a BTreeMap<String, String>,
    pub app: &'a ApplicationConfig,
    pub proxy: Option<&'a ProxyConfig>,
    pub image: &'a str,
}

/// Operand `--loglevel` value for the API's 1-5 verbosity scale
pub fn log_level_name(level: i32) -> &'static str {
    match level {
        1 => "warn",
        2 => "error",
        4 | 5 => "debug",
        _ => "info",
    }
}

pub fn build_deployment(operand: Operand, base: &Deployment, inputs: &OperandInputs<'_>) -> Deployment {
    let mut deployment = base.clone();
    deployment.metadata.namespace = Some(inputs.namespace.to_string());
    deployment.metadata.labels = Some(overlay_labels(
        deployment.metadata.labels.as_ref(),
        inputs.labels,
    ));

    let spec = deployment.spec.get_or_insert_with(Default::default);
    let selector = spec.selector.match_labels.clone().unwrap_or_default();
    let template_meta = spec.template.metadata.get_or_insert_with(Default::default);
    let mut template_labels = overlay_labels(template_meta.labels.as_ref(), inputs.labels);
    // the selector is immutable, so its keys keep their base values
    template_labels.extend(selector);
    template_meta.labels = Some(template_labels);

    let pod = spec.template.spec.get_or_insert_with(Default::default);
    apply_scheduling(pod, inputs.app);

    for container in &mut pod.containers {
        container.image = Some(inputs.image.to_string());
        container.resources = inputs.app.common.resources.clone();
    }
    if let Some(main) = pod.containers.first_mut() {
        let extra = operand_args(operand, inputs);
        if !extra.is_empty() {
            main.args.get_or_insert_with(Vec::new).extend(extra);
        }
    }

    if operand == Operand::BitwardenSdkServer {
        apply_bitwarden_tls_secret(pod, inputs.app);
    }

    if let Some(proxy) = inputs.proxy {
        apply_proxy(pod, proxy);
    }

    deployment
}

/// `base` labels with `overrides` applied on top
fn overlay_labels(
    base: Option<&BTreeMap<String, String>>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut labels = base.cloned().unwrap_or_default();
    labels.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    labels
}

/// Tolerations, node selector and affinity go on as given; the API server validates them
fn apply_scheduling(pod: &mut PodSpec, app: &ApplicationConfig) {
    pod.node_selector = app.common.node_selector.clone();
    pod.affinity = app.common.affinity.clone();
    pod.tolerations = app.common.tolerations.clone();
}

fn operand_args(operand: Operand, inputs: &OperandInputs<'_>) -> Vec<String> {
    let namespace = inputs.namespace;
    let log_level = format!("--loglevel={}", log_level_name(inputs.app.common.log_level));

    match operand {
        Operand::Controller => {
            let mut args = vec![log_level];
            if let Some(scope) = inputs.app.operating_namespace() {
                args.push(format!("--namespace={scope}"));
                args.push("--enable-cluster-store-reconciler=false".to_string());
                args.push("--enable-cluster-external-secret-reconciler=false".to_string());
            }
            args
        }
        Operand::Webhook => {
            let interval = inputs
                .app
                .webhook_config
                .as_ref()
                .and_then(|w| w.certificate_check_interval.as_deref())
                .unwrap_or(DEFAULT_CERTIFICATE_CHECK_INTERVAL);
            vec![
                format!("--dns-name={}.{namespace}.svc", Operand::Webhook.as_str()),
                format!("--check-interval={interval}"),
                log_level,
            ]
        }
        Operand::CertController => vec![
            format!("--service-namespace={namespace}"),
            format!("--secret-namespace={namespace}"),
            log_level,
        ],
        Operand::BitwardenSdkServer => Vec::new(),
    }
}

fn apply_bitwarden_tls_secret(pod: &mut PodSpec, app: &ApplicationConfig) {
    let Some(secret_name) = app
        .bitwarden_secret_manager_provider
        .as_ref()
        .and_then(|b| b.secret_ref.as_ref())
        .map(|r| r.name.clone())
        .filter(|name| !name.is_empty())
    else {
        return;
    };
    for volume in pod.volumes.iter_mut().flatten() {
        if volume.name == BITWARDEN_TLS_VOLUME {
            if let Some(secret) = volume.secret.as_mut() {
                secret.secret_name = Some(secret_name.clone());
            }
        }
    }
}

/// Environment variables for a proxy, upper-case first, empty fields skipped
pub fn proxy_env_vars(proxy: &ProxyConfig) -> Vec<(&'static str, &str)> {
    let pairs = [
        ("HTTP_PROXY", proxy.http_proxy.as_str()),
        ("HTTPS_PROXY", proxy.https_proxy.as_str()),
        ("NO_PROXY", proxy.no_proxy.as_str()),
        ("http_proxy", proxy.http_proxy.as_str()),
        ("https_proxy", proxy.https_proxy.as_str()),
        ("no_proxy", proxy.no_proxy.as_str()),
    ];
    pairs.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}

/// Add proxy variables, the CA bundle mount and its volume
///
/// Only adds or overwrites; variables and mounts already present are kept in place.
pub fn apply_proxy(pod: &mut PodSpec, proxy: &ProxyConfig) {
    let vars = proxy_env_vars(proxy);
    let containers = pod
        .containers
        .iter_mut()
        .chain(pod.init_containers.iter_mut().flatten());
    for container in containers {
        for (name, value) in &vars {
            upsert_env(container, name, value);
        }
        upsert_trusted_ca_mount(container);
    }

    let volumes = pod.volumes.get_or_insert_with(Vec::new);
    if !volumes.iter().any(|v| v.name == TRUSTED_CA_BUNDLE_VOLUME) {
        volumes.push(trusted_ca_volume());
    }
}

fn upsert_env(container: &mut Container, name: &str, value: &str) {
    let env = container.env.get_or_insert_with(Vec::new);
    if let Some(existing) = env.iter_mut().find(|e| e.name == name) {
        existing.value = Some(value.to_string());
        existing.value_from = None;
    } else {
        env.push(EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            value_from: None,
        });
    }
}

fn upsert_trusted_ca_mount(container: &mut Container) {
    let mount = VolumeMount {
        name: TRUSTED_CA_BUNDLE_VOLUME.to_string(),
        mount_path: TRUSTED_CA_BUNDLE_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    };
    let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
    match mounts.iter_mut().find(|m| m.name == TRUSTED_CA_BUNDLE_VOLUME) {
        Some(existing) => *existing = mount,
        None => mounts.push(mount),
    }
}

fn trusted_ca_volume() -> Volume {
    Volume {
        name: TRUSTED_CA_BUNDLE_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: TRUSTED_CA_BUNDLE_CONFIGMAP.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}
