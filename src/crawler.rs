//! Crawl orchestration.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CrawlSettings, FetchSpec};
use crate::extract::{LanguageStatsRule, RepoLink};
use crate::extractor::ResultExtractor;
use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::fetcher_http::SessionFactory;
use crate::proxy::{ProxyPool, ProxyProvider, ValidatedProxy};
use crate::proxy_source::ProxySource;
use crate::proxy_validator::ProxyValidator;
use crate::result::{CrawlOutput, RepoResult};
use crate::{CrawlError, Result};

/// Drives keyword searches and aggregates their results.
pub struct Crawler {
    extractor: ResultExtractor,
    primary: Arc<dyn PageFetcher>,
    fallback: Option<Arc<dyn PageFetcher>>,
    delay: (Duration, Duration),
    keyword_concurrency: usize,
    cancel: CancellationToken,
}

impl Crawler {
    /// Creates a crawler issuing every request through `primary`.
    pub fn new(extractor: ResultExtractor, primary: Arc<dyn PageFetcher>) -> Self {
        Self {
            extractor,
            primary,
            fallback: None,
            delay: (Duration::from_secs(1), Duration::from_secs(3)),
            keyword_concurrency: 4,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds sessions and the extractor from settings and the run's proxy pool.
    ///
    /// Unless `use_proxy` is set the primary session is direct, and a session
    /// bound to one random proxy from `pool` is kept for a single retry of
    /// failed searches.
    pub fn from_settings(settings: &CrawlSettings, pool: &ProxyPool) -> Result<Self> {
        let factory = SessionFactory::new(settings.request_timeout());
        let primary = factory.create_session(settings.use_proxy, pool)?;

        let fallback: Option<Arc<dyn PageFetcher>> = if !primary.is_proxied() && !pool.is_empty() {
            Some(Arc::new(factory.create_session(true, pool)?))
        } else {
            None
        };

        let extractor = ResultExtractor::new(&settings.base_url, Arc::new(LanguageStatsRule::new()?))?
            .with_detail_concurrency(settings.detail_concurrency);
        let (min, max) = settings.delay_range();

        let mut crawler = Crawler::new(extractor, Arc::new(primary))
            .with_delay(min, max)
            .with_keyword_concurrency(settings.keyword_concurrency);
        crawler.fallback = fallback;
        Ok(crawler)
    }

    /// Sets the session used once when a search on the primary session fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn PageFetcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Sets the bounds of the random delay before each search.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay = (min, max.max(min));
        self
    }

    /// Sets how many keywords are searched at once.
    ///
    /// Each in-flight keyword sleeps its own polite delay, so up to
    /// `concurrency` searches can leave within the same delay window. Use 1
    /// to space every search by a full delay.
    pub fn with_keyword_concurrency(mut self, concurrency: usize) -> Self {
        self.keyword_concurrency = concurrency.max(1);
        self
    }

    /// Ties the run to `token`; cancelling it aborts in-flight requests.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Crawls every keyword of `spec`.
    ///
    /// Every keyword appears in the output in input order; a keyword whose
    /// search failed maps to an empty list. Returns [`CrawlError::Cancelled`]
    /// if the cancellation token fires first.
    pub async fn run(&self, spec: &FetchSpec) -> Result<CrawlOutput> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Crawl cancelled, discarding partial results");
                Err(CrawlError::Cancelled)
            }
            output = self.crawl_all(spec) => Ok(output),
        }
    }

    async fn crawl_all(&self, spec: &FetchSpec) -> CrawlOutput {
        let mut seen = HashSet::new();
        let keywords: Vec<&str> = spec
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|keyword| seen.insert(*keyword))
            .collect();

        if keywords.is_empty() {
            debug!("No keywords to crawl");
            return CrawlOutput::new();
        }

        info!("Crawling {} keywords", keywords.len());

        stream::iter(keywords)
            .map(|keyword| async move {
                let results = self.crawl_keyword(keyword, spec).await;
                (keyword.to_string(), results)
            })
            .buffered(self.keyword_concurrency)
            .collect()
            .await
    }

    async fn crawl_keyword(&self, keyword: &str, spec: &FetchSpec) -> Vec<RepoResult> {
        self.polite_delay().await;

        let Some((fetcher, links)) = self.search_with_fallback(keyword, spec).await else {
            return Vec::new();
        };

        if links.is_empty() {
            warn!(keyword, "No repositories found");
            return Vec::new();
        }
        debug!(keyword, "Found {} repositories", links.len());

        if spec.fetch_detail {
            self.extractor.enrich_all(fetcher, links).await
        } else {
            links.into_iter().map(RepoLink::into_result).collect()
        }
    }

    /// Searches on the primary session, retrying once on the fallback session.
    /// Returns the session that succeeded with its links.
    async fn search_with_fallback(
        &self,
        keyword: &str,
        spec: &FetchSpec,
    ) -> Option<(&dyn PageFetcher, Vec<RepoLink>)> {
        let primary = self.primary.as_ref();
        let outcome = match self.extractor.search(primary, keyword, spec.search_type).await {
            FetchOutcome::Success(links) => return Some((primary, links)),
            outcome => outcome,
        };
        log_search_failure(keyword, primary, &outcome);

        let fallback = self.fallback.as_deref()?;
        info!(keyword, "Retrying search via {}", fallback.describe());
        match self.extractor.search(fallback, keyword, spec.search_type).await {
            FetchOutcome::Success(links) => Some((fallback, links)),
            outcome => {
                log_search_failure(keyword, fallback, &outcome);
                None
            }
        }
    }

    async fn polite_delay(&self) {
        let (min, max) = self.delay;
        if max.is_zero() {
            return;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

fn log_search_failure<T>(keyword: &str, fetcher: &dyn PageFetcher, outcome: &FetchOutcome<T>) {
    match outcome {
        FetchOutcome::SoftFailure(status) => {
            warn!(keyword, status = status.as_u16(), via = %fetcher.describe(), "Failed to fetch search results")
        }
        FetchOutcome::NetworkError(cause) => {
            error!(keyword, via = %fetcher.describe(), "Request error: {}", cause)
        }
        FetchOutcome::Success(_) => {}
    }
}

/// Validates the candidates of `supplied`; when none survive, discovers
/// candidates from the listing page and validates those. A provider failure
/// yields an empty pool.
pub async fn build_proxy_pool(supplied: &dyn ProxyProvider, settings: &CrawlSettings) -> ProxyPool {
    let validator = ProxyValidator::new(&settings.probe_url, settings.probe_timeout());

    let mut valid = validate_from(supplied, &validator).await;
    if valid.is_empty() {
        match SessionFactory::new(settings.request_timeout()).build(None) {
            Ok(session) => {
                let source = ProxySource::new(&settings.proxy_list_url, Arc::new(session));
                valid = validate_from(&source, &validator).await;
            }
            Err(e) => error!("Failed to create discovery session: {}", e),
        }
    }

    info!("Using {} valid proxies", valid.len());
    ProxyPool::from_validated(valid)
}

async fn validate_from(provider: &dyn ProxyProvider, validator: &ProxyValidator) -> Vec<ValidatedProxy> {
    match provider.fetch_proxies().await {
        Ok(candidates) => validator.validate(candidates).await,
        Err(e) => {
            error!("Failed to fetch proxies: {}", e);
            Vec::new()
        }
    }
}

/// Crawls `spec` with sessions built from `settings` and `pool`.
pub async fn run(
    spec: &FetchSpec,
    pool: &ProxyPool,
    settings: &CrawlSettings,
    cancel: CancellationToken,
) -> Result<CrawlOutput> {
    Crawler::from_settings(settings, pool)?
        .with_cancellation(cancel)
        .run(spec)
        .await
}
