//! # Shared CRD Types
//!
//! Types embedded in both `ExternalSecretsConfig` and `ExternalSecretsManager`.

use k8s_openapi::api::core::v1::{Affinity, ResourceRequirements, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proxy settings applied to the operand containers
///
/// Empty fields are omitted from the generated environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// URL of the proxy for HTTP requests
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_proxy: String,
    /// URL of the proxy for HTTPS requests
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub https_proxy: String,
    /// Comma-separated hostnames and CIDRs that bypass the proxy
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub no_proxy: String,
}

impl ProxyConfig {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.http_proxy.is_empty() && self.https_proxy.is_empty() && self.no_proxy.is_empty()
    }
}

/// Settings common to the operator-level and operand-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfigs {
    /// Operand verbosity (1-5)
    #[serde(default = "default_log_level")]
    pub log_level: i32,
    /// Resource requirements applied to every operand container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Scheduling affinity applied to every operand pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    /// Tolerations applied to every operand pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
    /// Node selector applied to every operand pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
    /// Proxy configuration for operand egress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl Default for CommonConfigs {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            resources: None,
            affinity: None,
            tolerations: None,
            node_selector: None,
            proxy: None,
        }
    }
}

pub fn default_log_level() -> i32 {
    1
}

/// Reference to an object by name, kind and group
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Reference to a Secret in the operand namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
}

/// Parse the string booleans used by the API (`"true"` / `"false"`)
pub(crate) fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}
