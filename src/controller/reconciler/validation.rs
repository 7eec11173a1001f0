//! # Validation
//!
//! Preconditions the CRD schema cannot express: those that depend on other
//! fields or on what the cluster has installed.

use crate::constants::{CERT_MANAGER_CERTIFICATES_PLURAL, CERT_MANAGER_GROUP_VERSION};
use crate::crd::ExternalSecretsConfigSpec;
use crate::store::{ObjectStore, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("spec.appConfig.certManagerConfig.enabled is set, but cert-manager is not installed")]
    CertManagerNotInstalled,

    #[error(
        "spec.appConfig.bitwardenSecretManagerProvider is enabled, but neither secretRef nor certManagerConfig provides its TLS certificate"
    )]
    BitwardenCertificateSourceMissing,
}

/// Optional API groups found on the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalCapabilities {
    pub cert_manager: bool,
}

impl OptionalCapabilities {
    /// Query the API server for the integrations `spec` asks for
    pub async fn discover(
        store: &dyn ObjectStore,
        spec: &ExternalSecretsConfigSpec,
    ) -> Result<Self, StoreError> {
        let mut capabilities = Self::default();
        if spec.app_config.cert_manager_enabled() {
            let kinds = store.list_kinds(CERT_MANAGER_GROUP_VERSION).await?;
            capabilities.cert_manager = kinds.iter().any(|k| k == CERT_MANAGER_CERTIFICATES_PLURAL);
            debug!(cert_manager = capabilities.cert_manager, "discovered optional capabilities");
        }
        Ok(capabilities)
    }
}

pub fn validate(
    spec: &ExternalSecretsConfigSpec,
    capabilities: &OptionalCapabilities,
) -> Result<(), ValidationError> {
    let app = &spec.app_config;

    if app.cert_manager_enabled() && !capabilities.cert_manager {
        return Err(ValidationError::CertManagerNotInstalled);
    }

    if app.bitwarden_enabled() {
        let has_secret_ref = app
            .bitwarden_secret_manager_provider
            .as_ref()
            .and_then(|b| b.secret_ref.as_ref())
            .is_some_and(|r| !r.name.is_empty());
        if !has_secret_ref && !app.cert_manager_enabled() {
            return Err(ValidationError::BitwardenCertificateSourceMissing);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{BitwardenSecretManagerProvider, CertManagerConfig, SecretReference};

    fn cert_manager_spec() -> ExternalSecretsConfigSpec {
        let mut spec = ExternalSecretsConfigSpec::default();
        spec.app_config.cert_manager_config = Some(CertManagerConfig {
            enabled: "true".to_string(),
            ..Default::default()
        });
        spec
    }

    #[test]
    fn test_no_integrations_is_valid() {
        assert_eq!(
            validate(&ExternalSecretsConfigSpec::default(), &OptionalCapabilities::default()),
            Ok(())
        );
    }

    #[test]
    fn test_cert_manager_requires_capability() {
        let spec = cert_manager_spec();
        assert_eq!(
            validate(&spec, &OptionalCapabilities::default()),
            Err(ValidationError::CertManagerNotInstalled)
        );
        assert_eq!(
            validate(&spec, &OptionalCapabilities { cert_manager: true }),
            Ok(())
        );
    }

    #[test]
    fn test_bitwarden_needs_certificate_source() {
        let mut spec = ExternalSecretsConfigSpec::default();
        spec.app_config.bitwarden_secret_manager_provider = Some(BitwardenSecretManagerProvider {
            enabled: "true".to_string(),
            secret_ref: None,
        });
        assert_eq!(
            validate(&spec, &OptionalCapabilities::default()),
            Err(ValidationError::BitwardenCertificateSourceMissing)
        );

        spec.app_config.bitwarden_secret_manager_provider = Some(BitwardenSecretManagerProvider {
            enabled: "true".to_string(),
            secret_ref: Some(SecretReference {
                name: "bitwarden-tls".to_string(),
            }),
        });
        assert_eq!(validate(&spec, &OptionalCapabilities::default()), Ok(()));
    }

    #[test]
    fn test_error_message_names_the_field() {
        assert_eq!(
            ValidationError::CertManagerNotInstalled.to_string(),
            "spec.appConfig.certManagerConfig.enabled is set, but cert-manager is not installed"
        );
    }
}
