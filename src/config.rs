//! Run configuration: the input artifact and crawler settings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::proxy::ProxyEndpoint;
use crate::{CrawlError, Result};

/// Category filter applied to the site search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SearchType {
    #[default]
    Repositories,
    Code,
    Issues,
    PullRequests,
    Discussions,
    Users,
    Commits,
    Packages,
    Wikis,
    Topics,
    Marketplace,
}

impl SearchType {
    /// Value sent as the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Repositories => "repositories",
            SearchType::Code => "code",
            SearchType::Issues => "issues",
            SearchType::PullRequests => "pullrequests",
            SearchType::Discussions => "discussions",
            SearchType::Users => "users",
            SearchType::Commits => "commits",
            SearchType::Packages => "registrypackages",
            SearchType::Wikis => "wikis",
            SearchType::Topics => "topics",
            SearchType::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = CrawlError;

    /// Case-insensitive, singular and plural forms accepted.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();

        let search_type = match normalized.as_str() {
            "repository" | "repositories" | "repo" | "repos" => SearchType::Repositories,
            "code" => SearchType::Code,
            "issue" | "issues" => SearchType::Issues,
            "pullrequest" | "pullrequests" | "pr" | "prs" => SearchType::PullRequests,
            "discussion" | "discussions" => SearchType::Discussions,
            "user" | "users" => SearchType::Users,
            "commit" | "commits" => SearchType::Commits,
            "package" | "packages" | "registrypackages" => SearchType::Packages,
            "wiki" | "wikis" => SearchType::Wikis,
            "topic" | "topics" => SearchType::Topics,
            "marketplace" => SearchType::Marketplace,
            _ => return Err(CrawlError::Config(format!("unknown search type '{}'", s))),
        };
        Ok(search_type)
    }
}

impl TryFrom<String> for SearchType {
    type Error = CrawlError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SearchType> for String {
    fn from(value: SearchType) -> Self {
        value.as_str().to_string()
    }
}

/// Tunables for a crawl run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Site the search and repository pages are fetched from.
    pub base_url: String,
    /// Public page listing candidate proxies.
    pub proxy_list_url: String,
    /// Low-payload endpoint probed through each candidate proxy.
    pub probe_url: String,
    /// Per-probe time budget in seconds.
    pub probe_timeout_secs: u64,
    /// Timeout for search and detail requests in seconds.
    pub request_timeout_secs: u64,
    /// Lower bound of the polite delay before each search, in milliseconds.
    pub delay_min_ms: u64,
    /// Upper bound of the polite delay before each search, in milliseconds.
    pub delay_max_ms: u64,
    /// Keywords searched at the same time.
    pub keyword_concurrency: usize,
    /// Detail pages fetched at the same time within one keyword.
    pub detail_concurrency: usize,
    /// Route the primary session through a proxy instead of only falling back to one.
    pub use_proxy: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            proxy_list_url: "https://free-proxy-list.net/".to_string(),
            probe_url: "http://www.gstatic.com/generate_204".to_string(),
            probe_timeout_secs: 5,
            request_timeout_secs: 30,
            delay_min_ms: 1000,
            delay_max_ms: 3000,
            keyword_concurrency: 4,
            detail_concurrency: 4,
            use_proxy: false,
        }
    }
}

impl CrawlSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Polite delay bounds, with `max` never below `min`.
    pub fn delay_range(&self) -> (Duration, Duration) {
        let min = self.delay_min_ms;
        let max = self.delay_max_ms.max(min);
        (Duration::from_millis(min), Duration::from_millis(max))
    }
}

/// What to fetch in one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub keywords: Vec<String>,
    pub search_type: SearchType,
    pub fetch_detail: bool,
}

impl FetchSpec {
    pub fn new(keywords: Vec<String>, search_type: SearchType) -> Self {
        Self {
            keywords,
            search_type,
            fetch_detail: false,
        }
    }

    /// Enables per-result detail enrichment.
    pub fn with_detail(mut self, fetch_detail: bool) -> Self {
        self.fetch_detail = fetch_detail;
        self
    }
}

/// The input artifact read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlInput {
    pub keywords: Vec<String>,
    #[serde(rename = "type", default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub extra: bool,
    /// Pre-supplied candidate proxies as `host:port`.
    #[serde(default)]
    pub proxies: Vec<String>,
    #[serde(default)]
    pub settings: CrawlSettings,
}

impl CrawlInput {
    /// Reads and parses the input artifact at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CrawlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&raw)
    }

    /// Parses the input artifact from its JSON text.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(CrawlError::Config("input is empty".to_string()));
        }
        let input: CrawlInput = serde_json::from_str(raw)
            .map_err(|e| CrawlError::Config(format!("invalid JSON input: {}", e)))?;
        input.proxy_candidates()?;
        Ok(input)
    }

    /// The immutable fetch specification for this run.
    pub fn fetch_spec(&self) -> FetchSpec {
        FetchSpec::new(self.keywords.clone(), self.search_type).with_detail(self.extra)
    }

    /// Pre-supplied proxies parsed into endpoints.
    pub fn proxy_candidates(&self) -> Result<Vec<ProxyEndpoint>> {
        self.proxies
            .iter()
            .map(|raw| {
                raw.parse::<ProxyEndpoint>()
                    .map_err(|e| CrawlError::Config(format!("invalid proxy '{}': {}", raw, e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxyScheme;

    #[test]
    fn test_search_type_default() {
        assert_eq!(SearchType::default(), SearchType::Repositories);
    }

    #[test]
    fn test_search_type_case_insensitive() {
        assert_eq!("Repositories".parse::<SearchType>().unwrap(), SearchType::Repositories);
        assert_eq!("repository".parse::<SearchType>().unwrap(), SearchType::Repositories);
        assert_eq!("CODE".parse::<SearchType>().unwrap(), SearchType::Code);
        assert_eq!("Pull Requests".parse::<SearchType>().unwrap(), SearchType::PullRequests);
        assert_eq!("issue".parse::<SearchType>().unwrap(), SearchType::Issues);
    }

    #[test]
    fn test_search_type_unknown() {
        let err = "gists".parse::<SearchType>().unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }

    #[test]
    fn test_search_type_query_value() {
        assert_eq!(SearchType::Packages.as_str(), "registrypackages");
        assert_eq!(SearchType::Issues.to_string(), "issues");
    }

    #[test]
    fn test_search_type_serialization() {
        let json = serde_json::to_string(&SearchType::Code).unwrap();
        assert_eq!(json, "\"code\"");
        let parsed: SearchType = serde_json::from_str("\"Issues\"").unwrap();
        assert_eq!(parsed, SearchType::Issues);
    }

    #[test]
    fn test_settings_default() {
        let settings = CrawlSettings::default();
        assert_eq!(settings.base_url, "https://github.com");
        assert_eq!(settings.probe_timeout(), Duration::from_secs(5));
        assert_eq!(
            settings.delay_range(),
            (Duration::from_millis(1000), Duration::from_millis(3000))
        );
        assert!(!settings.use_proxy);
    }

    #[test]
    fn test_settings_delay_range_clamped() {
        let settings = CrawlSettings {
            delay_min_ms: 500,
            delay_max_ms: 100,
            ..Default::default()
        };
        let (min, max) = settings.delay_range();
        assert_eq!(min, max);
    }

    #[test]
    fn test_input_parse_minimal() {
        let input = CrawlInput::parse(r#"{"keywords": ["foo"]}"#).unwrap();
        assert_eq!(input.keywords, vec!["foo"]);
        assert_eq!(input.search_type, SearchType::Repositories);
        assert!(!input.extra);
        assert!(input.proxies.is_empty());
        assert_eq!(input.settings, CrawlSettings::default());
    }

    #[test]
    fn test_input_parse_full() {
        let raw = r#"{
            "keywords": ["openstack", "nova"],
            "type": "Repositories",
            "extra": true,
            "proxies": ["194.126.37.94:8080", "13.78.125.167:443"],
            "settings": {"delay_min_ms": 0, "delay_max_ms": 0}
        }"#;
        let input = CrawlInput::parse(raw).unwrap();
        let spec = input.fetch_spec();
        assert_eq!(spec.keywords, vec!["openstack", "nova"]);
        assert!(spec.fetch_detail);
        assert_eq!(input.settings.delay_max_ms, 0);
        assert_eq!(input.settings.keyword_concurrency, 4);

        let proxies = input.proxy_candidates().unwrap();
        assert_eq!(proxies[0].scheme, ProxyScheme::Plain);
        assert_eq!(proxies[1].scheme, ProxyScheme::Tls);
    }

    #[test]
    fn test_input_parse_empty() {
        assert!(matches!(CrawlInput::parse("  \n"), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_input_parse_invalid_json() {
        assert!(matches!(CrawlInput::parse("keywords: foo"), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_input_parse_unknown_type() {
        let result = CrawlInput::parse(r#"{"keywords": ["foo"], "type": "gists"}"#);
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_input_parse_bad_proxy() {
        let result = CrawlInput::parse(r#"{"keywords": [], "proxies": ["nope"]}"#);
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }

    #[tokio::test]
    async fn test_input_load_missing_file() {
        let result = CrawlInput::load("/nonexistent/input.json").await;
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }
}
