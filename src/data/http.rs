//! Blocking HTTP plumbing shared by the acquisition clients.
//!
//! Both clients follow one policy: a per-request timeout, a bounded number of
//! retries for transient failures (transport errors, HTTP 5xx and 429) with a
//! linear backoff, and no retry for anything else.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::error::AppError;

const BACKOFF_MS: u64 = 500;
/// Default user agent for API clients.
pub(crate) const USER_AGENT: &str = concat!("rvf/", env!("CARGO_PKG_VERSION"));

pub(crate) enum FetchError {
    Transient(AppError),
    Permanent(AppError),
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub(crate) fn from_status(what: &str, status: StatusCode) -> Self {
        let err = AppError::acquisition(format!("{what} failed with status {status}."));
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            FetchError::Transient(err)
        } else {
            FetchError::Permanent(err)
        }
    }
}

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(user_agent)
        .build()
        .map_err(|e| AppError::acquisition(format!("Failed to build HTTP client: {e}")))
}

/// Run `op` until it succeeds, fails permanently, or `retries` are used up.
pub(crate) fn with_retries<T>(
    what: &str,
    retries: u32,
    mut op: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, AppError> {
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(FetchError::Permanent(err)) => return Err(err),
            Err(FetchError::Transient(err)) if attempt < retries => {
                attempt += 1;
                tracing::warn!(request = what, attempt, error = %err, "retrying request");
                thread::sleep(Duration::from_millis(BACKOFF_MS * u64::from(attempt)));
            }
            Err(FetchError::Transient(err)) => return Err(err),
        }
    }
}
