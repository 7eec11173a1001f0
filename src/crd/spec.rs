//! # ExternalSecretsConfig Spec
//!
//! The singleton resource describing how the external-secrets operand is installed.

use crate::crd::common::{is_true, CommonConfigs, ObjectReference, SecretReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ExternalSecretsConfig Custom Resource Definition
///
/// Cluster-scoped; the operator only acts on the object named `cluster`.
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.openshift.io/v1alpha1
/// kind: ExternalSecretsConfig
/// metadata:
///   name: cluster
/// spec:
///   appConfig:
///     logLevel: 2
///     proxy:
///       httpProxy: http://proxy.example.com:3128
///   controllerConfig:
///     labels:
///       team: platform
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ExternalSecretsConfig",
    group = "operator.openshift.io",
    version = "v1alpha1",
    status = "crate::crd::ExternalSecretsConfigStatus",
    shortname = "esc",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Message", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].message"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretsConfigSpec {
    /// Operand application settings
    #[serde(default)]
    pub app_config: ApplicationConfig,
    /// Operator-side settings for the managed objects
    #[serde(default)]
    pub controller_config: OperandControllerConfig,
}

/// Operand application settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Restrict the operand to a single namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitwarden_secret_manager_provider: Option<BitwardenSecretManagerProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_config: Option<WebhookConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_manager_config: Option<CertManagerConfig>,
    #[serde(flatten)]
    pub common: CommonConfigs,
}

impl ApplicationConfig {
    /// Whether the cert-manager integration was requested
    pub fn cert_manager_enabled(&self) -> bool {
        self.cert_manager_config
            .as_ref()
            .is_some_and(|c| is_true(&c.enabled))
    }

    /// Whether the bitwarden SDK server should be deployed
    pub fn bitwarden_enabled(&self) -> bool {
        self.bitwarden_secret_manager_provider
            .as_ref()
            .is_some_and(|b| is_true(&b.enabled))
    }

    /// Operating namespace, ignoring an empty string
    pub fn operating_namespace(&self) -> Option<&str> {
        self.operating_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
    }
}

/// Operator-side settings applied to every managed object
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperandControllerConfig {
    /// Namespace for the operand (defaults to `external-secrets`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Extra labels added to every managed object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitwardenSecretManagerProvider {
    /// `"true"` or `"false"`
    #[serde(default)]
    pub enabled: String,
    /// Secret holding the TLS key pair for the SDK server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// How often the webhook checks its certificate, as a duration string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_check_interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertManagerConfig {
    /// `"true"` or `"false"`
    pub enabled: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_injector_annotations: Option<String>,
    #[serde(default)]
    pub issuer_ref: ObjectReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_renew_before: Option<String>,
}
