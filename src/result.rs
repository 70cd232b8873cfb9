//! Crawl result types.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Language name to percentage text, in page order.
pub type LanguageStats = IndexMap<String, String>;

/// Per-repository metadata from the detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDetail {
    /// First path segment of the repository.
    pub owner: String,
    /// Language breakdown, e.g. `{"Python": "98.2%"}`.
    pub language_stats: LanguageStats,
}

impl RepoDetail {
    pub fn new(owner: impl Into<String>, language_stats: LanguageStats) -> Self {
        Self {
            owner: owner.into(),
            language_stats,
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoResult {
    /// Absolute repository URL.
    pub url: String,
    /// Present only when detail enrichment ran and succeeded.
    #[serde(rename = "extra", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<RepoDetail>,
}

impl RepoResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: RepoDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Keyword to its ordered results, in input keyword order.
pub type CrawlOutput = IndexMap<String, Vec<RepoResult>>;

/// Writes `output` as pretty JSON.
///
/// The document is written to a sibling temporary file and renamed into
/// place, so `path` never holds a partial document.
pub async fn write_output(path: impl AsRef<Path>, output: &CrawlOutput) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(output)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
