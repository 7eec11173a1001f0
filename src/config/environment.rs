//! # Environment
//!
//! Process environment access behind a trait, so reconciliation never reads
//! `std::env` directly and tests can inject fixed values.
//!
//! - [`EnvironmentProvider`] - lookup seam
//! - [`ProcessEnvironment`] - reads the real process environment
//! - [`StaticEnvironment`] - fixed map, used by tests
//! - [`OperandEnvironment`] - per-pass snapshot of the variables reconciliation uses

use crate::constants::{
    BITWARDEN_SDK_SERVER_IMAGE_ENV, EXTERNAL_SECRETS_IMAGE_ENV, HTTPS_PROXY_ENV, HTTP_PROXY_ENV,
    NO_PROXY_ENV,
};
use crate::crd::ProxyConfig;
use std::collections::BTreeMap;

/// Source of environment variables
pub trait EnvironmentProvider: Send + Sync + std::fmt::Debug {
    /// Value of `key`, or `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads variables from the operator process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: BTreeMap<String, String>,
}

impl StaticEnvironment {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Snapshot of the environment taken once at the start of a pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandEnvironment {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
    /// `RELATED_IMAGE_EXTERNAL_SECRETS`, empty values treated as unset
    pub external_secrets_image: Option<String>,
    /// `RELATED_IMAGE_BITWARDEN_SDK_SERVER`, empty values treated as unset
    pub bitwarden_sdk_server_image: Option<String>,
}

impl OperandEnvironment {
    pub fn capture(env: &dyn EnvironmentProvider) -> Self {
        let non_empty = |key: &str| env.var(key).filter(|v| !v.is_empty());
        Self {
            http_proxy: env.var(HTTP_PROXY_ENV).unwrap_or_default(),
            https_proxy: env.var(HTTPS_PROXY_ENV).unwrap_or_default(),
            no_proxy: env.var(NO_PROXY_ENV).unwrap_or_default(),
            external_secrets_image: non_empty(EXTERNAL_SECRETS_IMAGE_ENV),
            bitwarden_sdk_server_image: non_empty(BITWARDEN_SDK_SERVER_IMAGE_ENV),
        }
    }

    /// Proxy synthesized from the process variables, if any is set
    pub fn proxy(&self) -> Option<ProxyConfig> {
        let proxy = ProxyConfig {
            http_proxy: self.http_proxy.clone(),
            https_proxy: self.https_proxy.clone(),
            no_proxy: self.no_proxy.clone(),
        };
        (!proxy.is_empty()).then_some(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_reads_proxy_and_images() {
        let env = StaticEnvironment::default()
            .with(HTTP_PROXY_ENV, "http://proxy:3128")
            .with(EXTERNAL_SECRETS_IMAGE_ENV, "registry/eso:v0.11");
        let snapshot = OperandEnvironment::capture(&env);

        assert_eq!(snapshot.http_proxy, "http://proxy:3128");
        assert_eq!(snapshot.external_secrets_image.as_deref(), Some("registry/eso:v0.11"));
        assert_eq!(snapshot.bitwarden_sdk_server_image, None);
    }

    #[test]
    fn test_empty_image_is_unset() {
        let env = StaticEnvironment::default().with(EXTERNAL_SECRETS_IMAGE_ENV, "");
        assert_eq!(OperandEnvironment::capture(&env).external_secrets_image, None);
    }

    #[test]
    fn test_proxy_requires_one_non_empty_variable() {
        let env = StaticEnvironment::default()
            .with(HTTP_PROXY_ENV, "")
            .with(NO_PROXY_ENV, "");
        assert_eq!(OperandEnvironment::capture(&env).proxy(), None);

        let env = env.with(NO_PROXY_ENV, ".svc");
        let proxy = OperandEnvironment::capture(&env).proxy().unwrap();
        assert_eq!(proxy.no_proxy, ".svc");
        assert!(proxy.http_proxy.is_empty());
    }
}
