//! # Constants
//!
//! Fixed names, labels and default values shared across the operator.

/// Name of the singleton `ExternalSecretsConfig` and `ExternalSecretsManager` objects
pub const SINGLETON_NAME: &str = "cluster";

/// Namespace the operand is installed into when `controllerConfig.namespace` is unset
pub const DEFAULT_OPERAND_NAMESPACE: &str = "external-secrets";

/// Field manager recorded on every write
pub const FIELD_MANAGER: &str = "external-secrets-operator";

// Operand labels
pub const LABEL_APP: &str = "app";
pub const LABEL_APP_VALUE: &str = "external-secrets";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const OPERATOR_NAME: &str = "external-secrets-operator";

// Trusted CA bundle wiring for proxied egress
pub const TRUSTED_CA_BUNDLE_CONFIGMAP: &str = "external-secrets-trusted-ca-bundle";
pub const TRUSTED_CA_BUNDLE_VOLUME: &str = "trusted-ca-bundle";
pub const TRUSTED_CA_BUNDLE_MOUNT_PATH: &str = "/etc/pki/tls/certs";
pub const TRUSTED_CA_BUNDLE_INJECT_LABEL: &str = "config.openshift.io/inject-trusted-cabundle";

// Process environment injected by the operator bundle
pub const EXTERNAL_SECRETS_IMAGE_ENV: &str = "RELATED_IMAGE_EXTERNAL_SECRETS";
pub const BITWARDEN_SDK_SERVER_IMAGE_ENV: &str = "RELATED_IMAGE_BITWARDEN_SDK_SERVER";
pub const HTTP_PROXY_ENV: &str = "HTTP_PROXY";
pub const HTTPS_PROXY_ENV: &str = "HTTPS_PROXY";
pub const NO_PROXY_ENV: &str = "NO_PROXY";

// Optional integrations discovered at runtime
pub const CERT_MANAGER_GROUP_VERSION: &str = "cert-manager.io/v1";
pub const CERT_MANAGER_CERTIFICATES_PLURAL: &str = "certificates";

// Condition types and reasons written to ExternalSecretsConfig.status
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_DEGRADED: &str = "Degraded";
pub const REASON_READY: &str = "Ready";
pub const REASON_FAILED: &str = "Failed";
pub const REASON_PROGRESSING: &str = "Progressing";

// Default values for ControllerConfig
pub const DEFAULT_METRICS_PORT: u16 = 5000;
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STATUS_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_STATUS_RETRY_INITIAL_MS: u64 = 10;
pub const DEFAULT_APPLY_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_APPLY_RETRY_INITIAL_MS: u64 = 10;
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 500;
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30_000;
