//! Keyword search and per-repository enrichment over a page fetcher.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use url::Url;

use crate::config::SearchType;
use crate::extract::{extract_repo_links, DetailRule, RepoLink};
use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::result::{RepoDetail, RepoResult};
use crate::Result;

/// Runs searches against the site and enriches the hits.
pub struct ResultExtractor {
    base_url: Url,
    search_url: String,
    rule: Arc<dyn DetailRule>,
    detail_concurrency: usize,
}

impl ResultExtractor {
    /// Creates an extractor for the site at `base_url`.
    pub fn new(base_url: &str, rule: Arc<dyn DetailRule>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let search_url = base_url.join("/search")?.to_string();
        Ok(Self {
            base_url,
            search_url,
            rule,
            detail_concurrency: 4,
        })
    }

    /// Sets how many detail pages are fetched at once.
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    /// Searches `keyword` and returns the unique repository links in
    /// first-seen order. Failures are returned as-is for the caller to branch on.
    pub async fn search(
        &self,
        fetcher: &dyn PageFetcher,
        keyword: &str,
        search_type: SearchType,
    ) -> FetchOutcome<Vec<RepoLink>> {
        let query = [("q", keyword), ("type", search_type.as_str())];
        debug!(keyword, via = %fetcher.describe(), "Searching");

        fetcher
            .fetch(&self.search_url, &query)
            .await
            .map(|body| extract_repo_links(&self.base_url, &body))
    }

    /// Fetches the repository page of `link` and extracts its detail.
    ///
    /// Returns `None` when the page cannot be fetched.
    pub async fn enrich(&self, fetcher: &dyn PageFetcher, link: &RepoLink) -> Option<RepoDetail> {
        match fetcher.fetch(&link.url, &[]).await {
            FetchOutcome::Success(html) => {
                let language_stats = self.rule.extract(&html);
                Some(RepoDetail::new(link.owner(), language_stats))
            }
            failure => {
                warn!(url = %link.url, "Failed to fetch repository page: {}", failure);
                None
            }
        }
    }

    /// Enriches every link, keeping the input order. A failed page leaves
    /// that result without detail.
    pub async fn enrich_all(&self, fetcher: &dyn PageFetcher, links: Vec<RepoLink>) -> Vec<RepoResult> {
        stream::iter(links)
            .map(|link| async move {
                let detail = self.enrich(fetcher, &link).await;
                RepoResult {
                    url: link.url,
                    detail,
                }
            })
            .buffered(self.detail_concurrency)
            .collect()
            .await
    }
}
