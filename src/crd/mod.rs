//! # Custom Resource Definitions
//!
//! CRD types read and written by the operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `ExternalSecretsConfig`, the operand configuration
//! - `manager.rs` - `ExternalSecretsManager`, cluster-wide defaults
//! - `common.rs` - proxy, scheduling and reference types shared by both
//! - `status.rs` - status and condition types

mod common;
mod manager;
mod spec;
mod status;

// Re-export all public types
pub use common::{default_log_level, CommonConfigs, ObjectReference, ProxyConfig, SecretReference};
pub use manager::{ExternalSecretsManager, ExternalSecretsManagerSpec, GlobalConfig};
pub use spec::{
    ApplicationConfig, BitwardenSecretManagerProvider, CertManagerConfig, ExternalSecretsConfig,
    ExternalSecretsConfigSpec, OperandControllerConfig, WebhookConfig,
};
pub use status::{Condition, ExternalSecretsConfigStatus};
