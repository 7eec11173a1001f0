//! # ExternalSecretsManager
//!
//! Cluster-wide operator configuration. The reconciler only reads it, as the
//! second layer of configuration precedence.

use crate::crd::common::ProxyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ExternalSecretsManager",
    group = "operator.openshift.io",
    version = "v1alpha1",
    shortname = "esm"
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretsManagerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_config: Option<GlobalConfig>,
}

/// Defaults shared by every operand the operator manages
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Fallback proxy used when the ExternalSecretsConfig sets none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}
