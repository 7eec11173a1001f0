//! # ExternalSecretsConfig Status
//!
//! Status types written back by the reconciler.

use serde::{Deserialize, Serialize};

/// Status of the ExternalSecretsConfig resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretsConfigStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    // Image fields serialize as `null` when unset so a merge patch clears them

    /// Image reference the operand deployments run
    #[serde(default)]
    pub external_secrets_image: Option<String>,
    /// Image reference of the bitwarden SDK server, when deployed
    #[serde(default, rename = "bitwardenSDKServerImage")]
    pub bitwarden_sdk_server_image: Option<String>,
}

impl ExternalSecretsConfigStatus {
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    /// `True`, `False` or `Unknown`
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
