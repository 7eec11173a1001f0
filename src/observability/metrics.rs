//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `external_secrets_operator_reconciliations_total` - Total number of reconcile passes
//! - `external_secrets_operator_reconciliation_errors_total` - Failed passes by error class
//! - `external_secrets_operator_reconciliation_duration_seconds` - Duration of reconcile passes
//! - `external_secrets_operator_object_writes_total` - Creates and updates by kind
//! - `external_secrets_operator_conflict_retries_total` - Optimistic-concurrency retries by operation
//! - `external_secrets_operator_status_writes_total` - Status writes by outcome
//! - `external_secrets_operator_requeues_total` - Requeues scheduled by the error policy

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "external_secrets_operator_reconciliations_total",
        "Total number of reconcile passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_operator_reconciliation_errors_total",
            "Total number of failed reconcile passes",
        ),
        &["class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "external_secrets_operator_reconciliation_duration_seconds",
            "Duration of reconcile passes in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static OBJECT_WRITES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_operator_object_writes_total",
            "Total number of managed object writes",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create OBJECT_WRITES_TOTAL metric - this should never happen")
});

static CONFLICT_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_operator_conflict_retries_total",
            "Total number of retries after a version conflict",
        ),
        &["operation"],
    )
    .expect("Failed to create CONFLICT_RETRIES_TOTAL metric - this should never happen")
});

static STATUS_WRITES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_operator_status_writes_total",
            "Total number of status writes",
        ),
        &["outcome"],
    )
    .expect("Failed to create STATUS_WRITES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_operator_requeues_total",
            "Total number of requeues scheduled",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register every metric with the registry served on `/metrics`
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBJECT_WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFLICT_RETRIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(class: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[class]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_object_writes(kind: &str, operation: &str) {
    OBJECT_WRITES_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_conflict_retries(operation: &str) {
    CONFLICT_RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_status_writes(outcome: &str) {
    STATUS_WRITES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
