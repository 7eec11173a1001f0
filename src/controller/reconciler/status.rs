//! # Status Reporting
//!
//! Computes the `ExternalSecretsConfig` status for the outcome of a pass and
//! writes it back with the resource version it was computed from.

use crate::constants::{
    CONDITION_DEGRADED, CONDITION_READY, REASON_FAILED, REASON_PROGRESSING, REASON_READY,
};
use crate::controller::retry::{with_optimistic_retry, RetryPolicy};
use crate::crd::{Condition, ExternalSecretsConfigStatus};
use crate::observability;
use crate::store::{ObjectStore, StoreError};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

const STATUS_TRUE: &str = "True";
const STATUS_FALSE: &str = "False";

/// How a reconcile pass ended, as far as status is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Converged {
        external_secrets_image: String,
        bitwarden_sdk_server_image: Option<String>,
    },
    Failed {
        /// Whether the next pass may succeed on its own
        retryable: bool,
        message: String,
    },
}

/// Status to persist given the previous one and the outcome of this pass
///
/// Image fields survive failed passes; they describe what was last applied.
pub fn next_status(
    previous: Option<&ExternalSecretsConfigStatus>,
    outcome: &PassOutcome,
    generation: Option<i64>,
    now: &str,
) -> ExternalSecretsConfigStatus {
    let mut status = previous.cloned().unwrap_or_default();

    let (ready, degraded) = match outcome {
        PassOutcome::Converged {
            external_secrets_image,
            bitwarden_sdk_server_image,
        } => {
            status.external_secrets_image = Some(external_secrets_image.clone());
            status.bitwarden_sdk_server_image.clone_from(bitwarden_sdk_server_image);
            (
                (STATUS_TRUE, REASON_READY, "reconciliation successful"),
                (STATUS_FALSE, REASON_READY, ""),
            )
        }
        PassOutcome::Failed {
            retryable: false,
            message,
        } => (
            (STATUS_FALSE, REASON_FAILED, ""),
            (STATUS_TRUE, REASON_FAILED, message.as_str()),
        ),
        PassOutcome::Failed {
            retryable: true,
            message,
        } => (
            (STATUS_FALSE, REASON_PROGRESSING, message.as_str()),
            (STATUS_FALSE, REASON_PROGRESSING, ""),
        ),
    };

    set_condition(&mut status.conditions, CONDITION_DEGRADED, degraded, generation, now);
    set_condition(&mut status.conditions, CONDITION_READY, ready, generation, now);
    status
}

/// Upsert a condition; `lastTransitionTime` moves only when `status` changes
fn set_condition(
    conditions: &mut Vec<Condition>,
    r#type: &str,
    (status, reason, message): (&str, &str, &str),
    generation: Option<i64>,
    now: &str,
) {
    let message = (!message.is_empty()).then(|| message.to_string());

    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == r#type) {
        if existing.status != status {
            existing.status = status.to_string();
            existing.last_transition_time = Some(now.to_string());
        }
        existing.reason = Some(reason.to_string());
        existing.message = message;
        existing.observed_generation = generation;
        return;
    }

    conditions.push(Condition {
        r#type: r#type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(now.to_string()),
        reason: Some(reason.to_string()),
        message,
        observed_generation: generation,
    });
}

/// Persist the status for `outcome` on the named config
///
/// Each attempt re-reads the config so the computed status is based on, and
/// guarded by, the latest resource version. A config that no longer exists
/// has nothing to report to.
pub async fn report(
    store: &dyn ObjectStore,
    name: &str,
    outcome: &PassOutcome,
    policy: &RetryPolicy,
) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    with_optimistic_retry("update status", policy, StoreError::is_conflict, || {
        write_status(store, name, outcome, &now)
    })
    .await
    .map_err(|failure| {
        warn!(
            name,
            attempts = failure.attempts,
            error = %failure.last_error,
            "giving up on status update"
        );
        observability::metrics::increment_status_writes("failed");
        failure.last_error
    })
}

/// One read-compute-write attempt
async fn write_status(
    store: &dyn ObjectStore,
    name: &str,
    outcome: &PassOutcome,
    now: &str,
) -> Result<(), StoreError> {
    let Some(mut config) = store.get_config(name).await? else {
        debug!(name, "config gone, skipping status update");
        return Ok(());
    };

    let status = next_status(config.status.as_ref(), outcome, config.metadata.generation, now);
    if config.status.as_ref() == Some(&status) {
        observability::metrics::increment_status_writes("unchanged");
        return Ok(());
    }

    config.status = Some(status);
    store.update_config_status(&config).await?;
    observability::metrics::increment_status_writes("written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: &str = "2026-01-01T00:00:00Z";
    const T1: &str = "2026-01-01T00:05:00Z";

    fn converged() -> PassOutcome {
        PassOutcome::Converged {
            external_secrets_image: "registry/eso:v1".to_string(),
            bitwarden_sdk_server_image: None,
        }
    }

    #[test]
    fn test_success_sets_ready_and_image() {
        let status = next_status(None, &converged(), Some(3), T0);

        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, "True");
        assert_eq!(ready.reason.as_deref(), Some(REASON_READY));
        assert_eq!(ready.observed_generation, Some(3));
        let degraded = status.condition(CONDITION_DEGRADED).unwrap();
        assert_eq!(degraded.status, "False");
        assert_eq!(status.external_secrets_image.as_deref(), Some("registry/eso:v1"));
    }

    #[test]
    fn test_fatal_failure_degrades_and_keeps_image() {
        let previous = next_status(None, &converged(), Some(1), T0);
        let failed = PassOutcome::Failed {
            retryable: false,
            message: "cert-manager is not installed".to_string(),
        };
        let status = next_status(Some(&previous), &failed, Some(2), T1);

        let degraded = status.condition(CONDITION_DEGRADED).unwrap();
        assert_eq!(degraded.status, "True");
        assert_eq!(degraded.reason.as_deref(), Some(REASON_FAILED));
        assert_eq!(degraded.message.as_deref(), Some("cert-manager is not installed"));
        assert_eq!(degraded.last_transition_time.as_deref(), Some(T1));
        assert_eq!(status.condition(CONDITION_READY).unwrap().status, "False");
        assert_eq!(status.external_secrets_image.as_deref(), Some("registry/eso:v1"));
    }

    #[test]
    fn test_retryable_failure_is_progressing() {
        let failed = PassOutcome::Failed {
            retryable: true,
            message: "timed out".to_string(),
        };
        let status = next_status(None, &failed, None, T0);

        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, "False");
        assert_eq!(ready.reason.as_deref(), Some(REASON_PROGRESSING));
        assert_eq!(ready.message.as_deref(), Some("timed out"));
        assert_eq!(status.condition(CONDITION_DEGRADED).unwrap().status, "False");
    }

    #[test]
    fn test_transition_time_only_moves_on_status_change() {
        let first = next_status(None, &converged(), Some(1), T0);
        let second = next_status(Some(&first), &converged(), Some(1), T1);
        assert_eq!(first, second);

        let ready = second.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.last_transition_time.as_deref(), Some(T0));
    }
}
