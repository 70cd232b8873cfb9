//! # github-crawlee
//!
//! Fetches GitHub search results for a list of keywords, optionally enriching
//! each repository with its owner and language breakdown, with a pool of
//! validated free proxies to fall back on when the direct connection is
//! rate-limited.
//!
//! - Proxy discovery from a public listing page
//! - Concurrent proxy validation with a per-probe timeout
//! - Bounded-concurrency keyword crawling with a polite random delay
//! - Result deduplication preserving first-seen order
//!
//! ## Example
//!
//! ```rust,no_run
//! use github_crawlee::proxy::StaticProxyProvider;
//! use github_crawlee::{build_proxy_pool, run, CrawlSettings, FetchSpec, SearchType};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = CrawlSettings::default();
//!     let pool = build_proxy_pool(&StaticProxyProvider::new(Vec::new()), &settings).await;
//!
//!     let spec = FetchSpec::new(vec!["tokio".to_string()], SearchType::Repositories);
//!     let output = run(&spec, &pool, &settings, CancellationToken::new()).await?;
//!
//!     for (keyword, results) in &output {
//!         println!("{}: {} repositories", keyword, results.len());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod crawler;
mod error;
mod extract;
mod extractor;
mod fetcher;
mod fetcher_http;
mod result;

pub mod proxy;
pub mod proxy_source;
pub mod proxy_validator;

pub use config::{CrawlInput, CrawlSettings, FetchSpec, SearchType};
pub use crawler::{build_proxy_pool, run, Crawler};
pub use error::{CrawlError, Result};
pub use extract::{clean_fragment, extract_repo_links, DetailRule, LanguageStatsRule, RepoLink};
pub use extractor::ResultExtractor;
pub use fetcher::{FetchOutcome, PageFetcher};
pub use fetcher_http::{HttpSession, SessionFactory, USER_AGENTS};
pub use result::{write_output, CrawlOutput, LanguageStats, RepoDetail, RepoResult};
