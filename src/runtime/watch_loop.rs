//! # Watch Loop
//!
//! Runs the controller for `ExternalSecretsConfig`. Changes to the operand
//! Deployments and ConfigMaps, and to the `ExternalSecretsManager`, all map
//! onto the singleton `cluster` so drift and global config changes trigger a
//! pass.

use crate::config::ControllerConfig;
use crate::constants::{LABEL_MANAGED_BY, OPERATOR_NAME, SINGLETON_NAME};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{ExternalSecretsConfig, ExternalSecretsManager};
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::Client;
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every watched object maps to the singleton config
fn singleton<K>(_: K) -> Option<ObjectRef<ExternalSecretsConfig>> {
    Some(ObjectRef::new(SINGLETON_NAME))
}

/// Run the controller watch loop until a shutdown signal arrives
///
/// The controller stream is restarted after errors that end it; the server
/// is marked not ready once shutdown begins.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    let backoff_duration_ms = Arc::new(AtomicU64::new(config.watch_backoff_start_ms));

    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal, initiating graceful shutdown");
        shutdown_server_state.set_ready(false);
    });

    let operand_selector = format!("{LABEL_MANAGED_BY}={OPERATOR_NAME}");

    loop {
        if !server_state.ready() {
            info!("shutdown requested, exiting watch loop");
            break;
        }

        let configs: Api<ExternalSecretsConfig> = Api::all(client.clone());
        let deployments: Api<Deployment> = Api::all(client.clone());
        let config_maps: Api<ConfigMap> = Api::all(client.clone());
        let managers: Api<ExternalSecretsManager> = Api::all(client.clone());

        let backoff = backoff_duration_ms.clone();
        let backoff_start_ms = config.watch_backoff_start_ms;
        let backoff_max_ms = config.watch_backoff_max_ms;
        let restart_delay = config.watch_restart_delay();

        info!("starting controller watch loop");
        Controller::new(configs, watcher::Config::default().any_semantic())
            .watches(
                deployments,
                watcher::Config::default().labels(&operand_selector),
                singleton,
            )
            .watches(
                config_maps,
                watcher::Config::default().labels(&operand_selector),
                singleton,
            )
            .watches(managers, watcher::Config::default(), singleton)
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, reconciler.clone())
            .filter_map(move |event| {
                let backoff = backoff.clone();
                async move {
                    match &event {
                        Ok((object, _)) => {
                            backoff.store(backoff_start_ms, Ordering::Relaxed);
                            debug!(object = %object.name, "reconciled");
                            Some(event)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                backoff_max_ms,
                                restart_delay,
                            )
                            .await
                            .map(|()| event)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .await;

        if !server_state.ready() {
            info!("shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "controller watch stream ended, restarting in {:?}",
            restart_delay
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("controller stopped gracefully");
    Ok(())
}
