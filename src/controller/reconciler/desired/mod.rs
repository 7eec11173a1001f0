//! # Desired State
//!
//! Pure construction of every object the operator manages from the effective
//! configuration. Same inputs, same objects; nothing here performs I/O.
//!
//! - `assets`: embedded base manifests
//! - `deployment`: per-operand Deployment construction and proxy injection
//! - `configmap`: the trusted CA bundle ConfigMap

pub mod assets;
pub mod configmap;
pub mod deployment;

pub use assets::OperandAssets;
pub use configmap::build_trusted_ca_bundle;
pub use deployment::{apply_proxy, build_deployment, log_level_name, Operand, OperandInputs};

use crate::config::OperandEnvironment;
use crate::constants::{
    BITWARDEN_SDK_SERVER_IMAGE_ENV, DEFAULT_OPERAND_NAMESPACE, EXTERNAL_SECRETS_IMAGE_ENV,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{ExternalSecretsConfigSpec, ProxyConfig};
use crate::store::ManagedObject;
use std::collections::BTreeMap;

/// Output of one build: the objects to ensure and the images they run
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub objects: Vec<ManagedObject>,
    pub external_secrets_image: String,
    pub bitwarden_sdk_server_image: Option<String>,
}

/// Namespace all operand objects live in
pub fn operand_namespace(spec: &ExternalSecretsConfigSpec) -> &str {
    spec.controller_config
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_OPERAND_NAMESPACE)
}

/// Build the desired objects
///
/// `proxy` is the already-resolved effective proxy; `None` leaves proxy
/// settings out entirely.
pub fn build(
    spec: &ExternalSecretsConfigSpec,
    labels: &BTreeMap<String, String>,
    proxy: Option<&ProxyConfig>,
    environment: &OperandEnvironment,
    assets: &OperandAssets,
) -> Result<DesiredState, ReconcilerError> {
    let app = &spec.app_config;
    let namespace = operand_namespace(spec);

    let external_secrets_image = environment.external_secrets_image.clone().ok_or_else(|| {
        ReconcilerError::MissingRequiredInput(format!(
            "{EXTERNAL_SECRETS_IMAGE_ENV} environment variable with externalsecrets image not set"
        ))
    })?;
    let bitwarden_sdk_server_image = if app.bitwarden_enabled() {
        Some(environment.bitwarden_sdk_server_image.clone().ok_or_else(|| {
            ReconcilerError::MissingRequiredInput(format!(
                "{BITWARDEN_SDK_SERVER_IMAGE_ENV} environment variable with bitwarden-sdk-server image not set"
            ))
        })?)
    } else {
        None
    };

    let mut objects = Vec::new();
    if proxy.is_some() {
        objects.push(ManagedObject::ConfigMap(build_trusted_ca_bundle(namespace, labels)));
    }

    let inputs = OperandInputs {
        namespace,
        labels,
        app,
        proxy,
        image: &external_secrets_image,
    };
    objects.push(ManagedObject::Deployment(build_deployment(
        Operand::Controller,
        &assets.controller,
        &inputs,
    )));
    objects.push(ManagedObject::Deployment(build_deployment(
        Operand::Webhook,
        &assets.webhook,
        &inputs,
    )));
    // cert-manager issues the webhook certificate when enabled
    if !app.cert_manager_enabled() {
        objects.push(ManagedObject::Deployment(build_deployment(
            Operand::CertController,
            &assets.cert_controller,
            &inputs,
        )));
    }
    if let Some(image) = &bitwarden_sdk_server_image {
        let inputs = OperandInputs { image, ..inputs };
        objects.push(ManagedObject::Deployment(build_deployment(
            Operand::BitwardenSdkServer,
            &assets.bitwarden_sdk_server,
            &inputs,
        )));
    }

    Ok(DesiredState {
        objects,
        external_secrets_image,
        bitwarden_sdk_server_image,
    })
}
