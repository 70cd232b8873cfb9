//! Page fetcher abstraction for retrieving HTML content.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;

/// Outcome of one fetch.
///
/// Non-success statuses (rate limiting, server errors) are expected and
/// frequent, so they are a variant rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T = String> {
    /// Success status, with the response body.
    Success(T),
    /// The server answered with a non-success status.
    SoftFailure(StatusCode),
    /// The request never produced a status (connect, timeout, body read).
    NetworkError(String),
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Maps the success value, keeping failures as they are.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Success(body) => FetchOutcome::Success(f(body)),
            FetchOutcome::SoftFailure(status) => FetchOutcome::SoftFailure(status),
            FetchOutcome::NetworkError(cause) => FetchOutcome::NetworkError(cause),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(body) => Some(body),
            _ => None,
        }
    }
}

impl<T> fmt::Display for FetchOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(_) => f.write_str("success"),
            FetchOutcome::SoftFailure(status) => write!(f, "status {}", status),
            FetchOutcome::NetworkError(cause) => write!(f, "network error: {}", cause),
        }
    }
}

/// Trait for fetching the HTML content of a URL.
///
/// All configuration (headers, proxy, timeouts) is fixed at construction
/// time; `fetch` is a URL-and-query-in, outcome-out interface.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Issues a GET for `url` with the given query parameters.
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> FetchOutcome;

    /// Short description for logs, e.g. `direct` or `proxy 1.2.3.4:8080`.
    fn describe(&self) -> String {
        "direct".to_string()
    }
}
