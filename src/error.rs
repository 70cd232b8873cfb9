//! Error types for the crawler.

use thiserror::Error;

/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Errors that can occur while crawling.
///
/// Only [`CrawlError::Config`] is fatal to a run. Everything network-facing is
/// isolated to the keyword, result or proxy it affects and reported through
/// logs instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Input artifact is missing, empty or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Proxy listing page could not be fetched.
    #[error("Proxy discovery failed: {0}")]
    ProxyDiscovery(String),

    /// HTTP client or request failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response or an extraction rule.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was cancelled before it completed.
    #[error("Crawl cancelled")]
    Cancelled,

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
