//! # Reconcile
//!
//! One pass over the singleton `ExternalSecretsConfig`:
//!
//! 1. read the config and discover optional capabilities
//! 2. validate
//! 3. resolve proxy and labels across spec, global config and environment
//! 4. build the desired objects
//! 5. ensure each object, retrying version conflicts from a fresh read
//! 6. report status, exactly once, whatever happened above
//!
//! Steps 1-5 share the pass deadline. Status is written after the deadline so
//! a timed-out pass still leaves a record.

use crate::config::OperandEnvironment;
use crate::constants::{CERT_MANAGER_GROUP_VERSION, SINGLETON_NAME};
use crate::controller::reconciler::apply::{self, EnsureOutcome};
use crate::controller::reconciler::desired::{self, DesiredState};
use crate::controller::reconciler::resolve::{resolve_labels, resolve_proxy};
use crate::controller::reconciler::status::{self, PassOutcome};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::reconciler::validation::{validate, OptionalCapabilities};
use crate::controller::retry::with_optimistic_retry;
use crate::crd::ExternalSecretsConfig;
use crate::observability;
use crate::store::{ManagedObject, StoreError};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Controller entry point
///
/// Only the singleton named `cluster` is managed; any other instance is
/// ignored until it changes.
pub async fn reconcile(
    obj: Arc<ExternalSecretsConfig>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    if name != SINGLETON_NAME {
        warn!(
            resource.name = %name,
            "ignoring ExternalSecretsConfig, only '{}' is reconciled", SINGLETON_NAME
        );
        return Ok(Action::await_change());
    }

    let span = info_span!(
        "controller.reconcile",
        resource.name = %name,
        resource.generation = obj.metadata.generation.unwrap_or(0),
    );

    async {
        observability::metrics::increment_reconciliations();
        let started = Instant::now();

        let result = reconcile_pass(&name, &ctx).await;
        observability::metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());

        result?;
        if let Ok(mut states) = ctx.backoff_states.lock() {
            if let Some(state) = states.get_mut(&name) {
                state.reset();
            }
        }
        info!("reconciliation complete");
        Ok::<_, ReconcilerError>(Action::await_change())
    }
    .instrument(span)
    .await
}

/// Converge, then report the outcome
///
/// The returned error combines the pass error with a failed status write.
pub async fn reconcile_pass(name: &str, ctx: &Reconciler) -> Result<(), ReconcilerError> {
    let deadline = ctx.config.reconcile_timeout();
    let pass = match tokio::time::timeout(deadline, converge(name, ctx)).await {
        Ok(result) => result,
        Err(_) => Err(ReconcilerError::DeadlineExceeded(deadline)),
    };

    let outcome = match &pass {
        Ok(None) => {
            debug!(name, "config not found, nothing to reconcile");
            return Ok(());
        }
        Ok(Some(state)) => PassOutcome::Converged {
            external_secrets_image: state.external_secrets_image.clone(),
            bitwarden_sdk_server_image: state.bitwarden_sdk_server_image.clone(),
        },
        Err(e) => PassOutcome::Failed {
            retryable: e.is_retryable(),
            message: e.to_string(),
        },
    };

    let reported = status::report(
        ctx.store.as_ref(),
        name,
        &outcome,
        &ctx.config.status_retry_policy(),
    )
    .await;

    match (pass, reported) {
        (Ok(_), Ok(())) => Ok(()),
        (Ok(_), Err(status_error)) => Err(ReconcilerError::StatusUpdate(status_error)),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(status_error)) => Err(ReconcilerError::Aggregate {
            error: Box::new(error),
            status_error,
        }),
    }
}

/// Everything up to and including the writes; `Ok(None)` when the config is gone
async fn converge(name: &str, ctx: &Reconciler) -> Result<Option<DesiredState>, ReconcilerError> {
    let store = ctx.store.as_ref();

    let Some(config) = store
        .get_config(name)
        .await
        .map_err(|source| ReconcilerError::Store {
            operation: "read",
            object: format!("ExternalSecretsConfig {name}"),
            source,
        })?
    else {
        return Ok(None);
    };
    let spec = &config.spec;

    let capabilities = OptionalCapabilities::discover(store, spec)
        .await
        .map_err(|source| ReconcilerError::Store {
            operation: "discover",
            object: CERT_MANAGER_GROUP_VERSION.to_string(),
            source,
        })?;
    validate(spec, &capabilities)?;

    let manager = store
        .get_manager(SINGLETON_NAME)
        .await
        .map_err(|source| ReconcilerError::Store {
            operation: "read",
            object: format!("ExternalSecretsManager {SINGLETON_NAME}"),
            source,
        })?;
    let global = manager.as_ref().and_then(|m| m.spec.global_config.as_ref());

    let environment = OperandEnvironment::capture(ctx.environment.as_ref());
    let proxy = resolve_proxy(spec, global, &environment);
    let labels = resolve_labels(spec, global);

    let state = desired::build(spec, &labels, proxy.as_ref(), &environment, &ctx.assets)?;

    let mut applied = 0usize;
    for object in &state.objects {
        if apply_object(ctx, object).await?.applied() {
            applied += 1;
        }
    }
    debug!(objects = state.objects.len(), applied, "desired state ensured");

    Ok(Some(state))
}

async fn apply_object(
    ctx: &Reconciler,
    object: &ManagedObject,
) -> Result<EnsureOutcome, ReconcilerError> {
    let store = ctx.store.as_ref();
    let policy = ctx.config.apply_retry_policy();

    with_optimistic_retry("ensure", &policy, StoreError::is_conflict, || {
        apply::ensure(store, object)
    })
    .await
    .map_err(|failure| {
        let object = object.key().to_string();
        match failure.last_error {
            StoreError::Rejected { message, .. } => ReconcilerError::ApplyRejected { object, message },
            e if e.is_conflict() => ReconcilerError::ConflictExhausted {
                object,
                attempts: failure.attempts,
                message: e.to_string(),
            },
            source => ReconcilerError::Store {
                operation: "apply",
                object,
                source,
            },
        }
    })
}
