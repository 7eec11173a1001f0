//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::config::environment::{EnvironmentProvider, ProcessEnvironment};
use crate::controller::retry::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables
/// set on the operator deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Upper bound for one reconcile pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// Upper bound for one API server call (seconds)
    pub api_timeout_secs: u64,
    /// Attempts for the status read-modify-write loop
    pub status_retry_attempts: u32,
    /// First delay between status write attempts (milliseconds)
    pub status_retry_initial_ms: u64,
    /// Attempts for each managed object ensure
    pub apply_retry_attempts: u32,
    /// First delay between ensure attempts (milliseconds)
    pub apply_retry_initial_ms: u64,
    /// Fibonacci requeue minimum after a retryable failure (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci requeue maximum after a retryable failure (minutes)
    pub backoff_max_minutes: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream backoff after 429 responses (milliseconds)
    pub watch_backoff_start_ms: u64,
    pub watch_backoff_max_ms: u64,
    /// Global log filter (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            status_retry_attempts: DEFAULT_STATUS_RETRY_ATTEMPTS,
            status_retry_initial_ms: DEFAULT_STATUS_RETRY_INITIAL_MS,
            apply_retry_attempts: DEFAULT_APPLY_RETRY_ATTEMPTS,
            apply_retry_initial_ms: DEFAULT_APPLY_RETRY_INITIAL_MS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_backoff_start_ms: DEFAULT_WATCH_BACKOFF_START_MS,
            watch_backoff_max_ms: DEFAULT_WATCH_BACKOFF_MAX_MS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment with defaults
    pub fn from_env() -> Self {
        Self::from_provider(&ProcessEnvironment)
    }

    /// Load configuration from any environment provider
    pub fn from_provider(env: &dyn EnvironmentProvider) -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default(env, "METRICS_PORT", DEFAULT_METRICS_PORT),
            reconcile_timeout_secs: env_var_or_default(
                env,
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            api_timeout_secs: env_var_or_default(env, "API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS),
            status_retry_attempts: env_var_or_default(
                env,
                "STATUS_RETRY_ATTEMPTS",
                DEFAULT_STATUS_RETRY_ATTEMPTS,
            ),
            status_retry_initial_ms: env_var_or_default(
                env,
                "STATUS_RETRY_INITIAL_MS",
                DEFAULT_STATUS_RETRY_INITIAL_MS,
            ),
            apply_retry_attempts: env_var_or_default(
                env,
                "APPLY_RETRY_ATTEMPTS",
                DEFAULT_APPLY_RETRY_ATTEMPTS,
            ),
            apply_retry_initial_ms: env_var_or_default(
                env,
                "APPLY_RETRY_INITIAL_MS",
                DEFAULT_APPLY_RETRY_INITIAL_MS,
            ),
            backoff_min_minutes: env_var_or_default(
                env,
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                env,
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            watch_restart_delay_secs: env_var_or_default(
                env,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_backoff_start_ms: env_var_or_default(
                env,
                "WATCH_BACKOFF_START_MS",
                DEFAULT_WATCH_BACKOFF_START_MS,
            ),
            watch_backoff_max_ms: env_var_or_default(
                env,
                "WATCH_BACKOFF_MAX_MS",
                DEFAULT_WATCH_BACKOFF_MAX_MS,
            ),
            log_level: env_var_or_default_str(env, "LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str(env, "LOG_FORMAT", "json"),
        }
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Retry policy for the status read-modify-write loop
    pub fn status_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::conflict_default()
            .with_max_attempts(self.status_retry_attempts)
            .with_initial_delay(Duration::from_millis(self.status_retry_initial_ms))
    }

    /// Retry policy for a managed object ensure
    pub fn apply_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::conflict_default()
            .with_max_attempts(self.apply_retry_attempts)
            .with_initial_delay(Duration::from_millis(self.apply_retry_initial_ms))
    }
}

/// Helper function to get environment variable or default
fn env_var_or_default<T>(env: &dyn EnvironmentProvider, key: &str, default: T) -> T
where
    T: FromStr,
{
    env.var(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Helper function to get string environment variable or default
fn env_var_or_default_str(env: &dyn EnvironmentProvider, key: &str, default: &str) -> String {
    env.var(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment::StaticEnvironment;

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ControllerConfig::from_provider(&StaticEnvironment::default());
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.metrics_port, 5000);
        assert_eq!(config.status_retry_attempts, 5);
    }

    #[test]
    fn test_overrides_from_environment() {
        let env = StaticEnvironment::from_pairs([
            ("METRICS_PORT", "9090"),
            ("RECONCILE_TIMEOUT_SECS", "30"),
            ("LOG_FORMAT", "text"),
        ]);
        let config = ControllerConfig::from_provider(&env);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_unparseable_value_falls_back_to_default() {
        let env = StaticEnvironment::from_pairs([("API_TIMEOUT_SECS", "soon")]);
        let config = ControllerConfig::from_provider(&env);
        assert_eq!(config.api_timeout_secs, crate::constants::DEFAULT_API_TIMEOUT_SECS);
    }

    #[test]
    fn test_retry_policies_follow_config() {
        let config = ControllerConfig {
            status_retry_attempts: 3,
            status_retry_initial_ms: 1,
            ..Default::default()
        };
        let policy = config.status_retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1));
    }
}
