//! # Types
//!
//! Core types for the reconciler: the error taxonomy, per-resource backoff
//! state and the shared reconcile context.

use crate::config::{ControllerConfig, EnvironmentProvider};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::desired::OperandAssets;
use crate::controller::reconciler::validation::ValidationError;
use crate::store::{ObjectStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A requested integration's preconditions do not hold
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A value the operator process must provide is absent
    #[error("{0}")]
    MissingRequiredInput(String),

    /// The API server refused a managed object; `message` is its response
    #[error("failed to apply {object}: {message}")]
    ApplyRejected { object: String, message: String },

    #[error("failed to apply {object} after {attempts} conflicting writes: {message}")]
    ConflictExhausted {
        object: String,
        attempts: u32,
        message: String,
    },

    #[error("failed to {operation} {object}: {source}")]
    Store {
        operation: &'static str,
        object: String,
        #[source]
        source: StoreError,
    },

    /// An embedded operand manifest did not parse
    #[error("invalid operand manifest {name}: {message}")]
    Template { name: &'static str, message: String },

    #[error("reconcile pass did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("failed to update status: {0}")]
    StatusUpdate(#[source] StoreError),

    /// The pass failed and recording that failure in status failed too
    #[error("{error}; additionally failed to update status: {status_error}")]
    Aggregate {
        error: Box<ReconcilerError>,
        status_error: StoreError,
    },
}

impl ReconcilerError {
    /// Whether a later pass may succeed without a configuration change
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::MissingRequiredInput(_)
            | Self::ApplyRejected { .. }
            | Self::Template { .. } => false,
            Self::ConflictExhausted { .. }
            | Self::Store { .. }
            | Self::DeadlineExceeded(_)
            | Self::StatusUpdate(_)
            // the status write still has to land
            | Self::Aggregate { .. } => true,
        }
    }

    /// Short label for metrics
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MissingRequiredInput(_) => "missing_input",
            Self::ApplyRejected { .. } => "apply_rejected",
            Self::ConflictExhausted { .. } => "conflict",
            Self::Store { .. } => "transient",
            Self::Template { .. } => "template",
            Self::DeadlineExceeded(_) => "deadline",
            Self::StatusUpdate(_) => "status",
            Self::Aggregate { .. } => "aggregate",
        }
    }
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared context handed to every reconcile pass
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ObjectStore>,
    pub environment: Arc<dyn EnvironmentProvider>,
    pub config: ControllerConfig,
    pub assets: Arc<OperandAssets>,
    /// Per-resource backoff, owned by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .field("environment", &self.environment)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        environment: Arc<dyn EnvironmentProvider>,
        config: ControllerConfig,
    ) -> Result<Self, ReconcilerError> {
        Ok(Self {
            store,
            environment,
            config,
            assets: Arc::new(OperandAssets::load()?),
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}
