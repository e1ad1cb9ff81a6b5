//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ClientError, ClientResult};

/// Default per-request timeout for external APIs.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build a client with a total request timeout.
pub fn build_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("factreel/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))
}

/// Read a timeout in seconds from `key`, falling back to the default.
pub(crate) fn timeout_from_env(key: &str) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
