//! # External Secrets Operator
//!
//! Installs and keeps converged the external-secrets operand for the
//! cluster-scoped `ExternalSecretsConfig` named `cluster`.
//!
//! Settings are read from environment variables; see
//! [`ControllerConfig`](external_secrets_operator::config::ControllerConfig).

use anyhow::Result;
use external_secrets_operator::runtime::initialization::initialize;
use external_secrets_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.client, init.reconciler, init.server_state, init.config).await
}
