//! # Reconciler
//!
//! Drives the operand of the singleton `ExternalSecretsConfig` toward the
//! state its spec describes.
//!
//! ## Reconciliation Flow
//!
//! 1. Discover optional capabilities and validate (`validation`)
//! 2. Resolve proxy and labels across configuration layers (`resolve`)
//! 3. Build the desired objects (`desired`)
//! 4. Ensure each object, writing only managed-field drift (`apply`)
//! 5. Report conditions and images on the config status (`status`)

pub mod apply;
pub mod desired;
pub mod quantity;
pub mod reconcile;
pub mod resolve;
pub mod status;
pub mod types;
pub mod validation;

// Re-export public API
pub use apply::{ensure, merge_managed, EnsureOutcome};
pub use desired::{DesiredState, OperandAssets};
pub use reconcile::{reconcile, reconcile_pass};
pub use resolve::{resolve_labels, resolve_proxy};
pub use status::{next_status, report, PassOutcome};
pub use types::{BackoffState, Reconciler, ReconcilerError};
pub use validation::{validate, OptionalCapabilities, ValidationError};
