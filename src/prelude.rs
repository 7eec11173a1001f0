//! Common imports for code built on the operator library.

pub use crate::config::{ControllerConfig, EnvironmentProvider, OperandEnvironment};
pub use crate::controller::reconciler::{Reconciler, ReconcilerError};
pub use crate::crd::{ExternalSecretsConfig, ExternalSecretsConfigSpec, ExternalSecretsManager};
pub use crate::store::{ManagedObject, ObjectKey, ObjectKind, ObjectStore, StoreError};
