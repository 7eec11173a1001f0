//! # Operand Assets
//!
//! Base Deployment manifests compiled into the binary. The builder starts
//! every desired Deployment from one of these.

use crate::controller::reconciler::types::ReconcilerError;
use k8s_openapi::api::apps::v1::Deployment;

const EXTERNAL_SECRETS: &str = include_str!("../../../../assets/deployments/external-secrets.yaml");
const WEBHOOK: &str = include_str!("../../../../assets/deployments/webhook.yaml");
const CERT_CONTROLLER: &str = include_str!("../../../../assets/deployments/cert-controller.yaml");
const BITWARDEN_SDK_SERVER: &str =
    include_str!("../../../../assets/deployments/bitwarden-sdk-server.yaml");

/// Parsed base manifests, loaded once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct OperandAssets {
    pub controller: Deployment,
    pub webhook: Deployment,
    pub cert_controller: Deployment,
    pub bitwarden_sdk_server: Deployment,
}

impl OperandAssets {
    pub fn load() -> Result<Self, ReconcilerError> {
        Ok(Self {
            controller: parse("external-secrets.yaml", EXTERNAL_SECRETS)?,
            webhook: parse("webhook.yaml", WEBHOOK)?,
            cert_controller: parse("cert-controller.yaml", CERT_CONTROLLER)?,
            bitwarden_sdk_server: parse("bitwarden-sdk-server.yaml", BITWARDEN_SDK_SERVER)?,
        })
    }
}

fn parse(name: &'static str, manifest: &str) -> Result<Deployment, ReconcilerError> {
    serde_yaml::from_str(manifest).map_err(|e| ReconcilerError::Template {
        name,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_manifests_parse() {
        let assets = OperandAssets::load().unwrap();
        for deployment in [
            &assets.controller,
            &assets.webhook,
            &assets.cert_controller,
            &assets.bitwarden_sdk_server,
        ] {
            let pod = deployment
                .spec
                .as_ref()
                .and_then(|s| s.template.spec.as_ref())
                .unwrap();
            assert!(!pod.containers.is_empty());
            assert!(deployment.metadata.name.is_some());
        }
        assert_eq!(
            assets.webhook.metadata.name.as_deref(),
            Some("external-secrets-webhook")
        );
    }

    #[test]
    fn test_invalid_manifest_is_a_template_error() {
        let err = parse("broken.yaml", "spec: [").unwrap_err();
        assert!(matches!(err, ReconcilerError::Template { name: "broken.yaml", .. }));
    }
}
