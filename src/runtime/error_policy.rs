//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::ExternalSecretsConfig;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue decision for a failed pass
///
/// Errors that need a configuration change wait for the next change to the
/// watched objects. Everything else requeues with a per-resource Fibonacci
/// backoff.
pub fn handle_reconciliation_error(
    obj: Arc<ExternalSecretsConfig>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %name,
        error.class = error.class(),
    );
    let _error_guard = error_span.enter();

    error!("reconciliation of {} failed: {}", name, error);
    observability::metrics::increment_reconciliation_errors(error.class());

    if !error.is_retryable() {
        info!("not requeueing, waiting for a configuration change");
        observability::metrics::increment_requeues_total("await-change");
        return Action::await_change();
    }

    let config = &ctx.config;
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(name).or_insert_with(|| {
                BackoffState::new(config.backoff_min_minutes, config.backoff_max_minutes)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("failed to lock backoff states: {}, using minimum backoff", e);
            (config.backoff_min_minutes.max(1) * 60, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        error_count,
        "requeueing in {}s at {} (trigger source: error-backoff)",
        backoff_seconds,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classification of an error surfaced by the controller stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

impl WatchErrorKind {
    pub fn classify(error_string: &str) -> Self {
        // 404s can carry "WatchFailed" in their chain, so check them before 401
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        if (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found
        {
            Self::Unauthorized
        } else if error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone")
        {
            Self::Expired
        } else if error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests")
        {
            Self::TooManyRequests
        } else if is_not_found {
            Self::NotFound
        } else {
            Self::Other
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> Option<()> {
    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("watch authentication failed (401), RBAC may have been revoked or the token expired");
            warn!(
                "waiting {:?} before retrying watch so RBAC changes can propagate",
                watch_restart_delay
            );
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "watch resource version expired, watch will restart");
            None
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(
                current_backoff.saturating_mul(2).min(max_backoff_ms),
                Ordering::Relaxed,
            );
            None
        }
        WatchErrorKind::NotFound => {
            warn!(
                "resource not found (404), the CRD may be missing or the object deleted: {}",
                error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("controller stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
    }
}
