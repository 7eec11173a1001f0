//! # Configuration
//!
//! - `controller`: operator settings loaded from environment variables
//! - `environment`: environment lookup seam and the per-pass operand snapshot

pub mod controller;
pub mod environment;

pub use controller::ControllerConfig;
pub use environment::{EnvironmentProvider, OperandEnvironment, ProcessEnvironment, StaticEnvironment};
