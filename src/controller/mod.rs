//! # Controller
//!
//! Core controller modules for the External Secrets Operator.
//!
//! - `backoff`: Fibonacci backoff between failed passes
//! - `reconciler`: Core reconciliation logic
//! - `retry`: Bounded retry of optimistic-concurrency conflicts
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod retry;
pub mod server;
