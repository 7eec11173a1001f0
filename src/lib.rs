//! External Secrets Operator Library
//!
//! Reconciliation engine for the `ExternalSecretsConfig` API: configuration
//! resolution, validation, desired-state construction, managed-field apply
//! and status reporting, plus the runtime that drives them.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
