//! Candidate proxy discovery from a public listing page.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::proxy::{endpoint_from_parts, ProxyEndpoint, ProxyProvider, ProxyScheme, TLS_PORTS};
use crate::{CrawlError, Result};

static PLAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b").expect("valid regex")
});

static TLS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(443|8443)\b").expect("valid regex")
});

/// Endpoints found on a listing page, split by scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredProxies {
    pub plain: Vec<ProxyEndpoint>,
    pub tls: Vec<ProxyEndpoint>,
}

impl DiscoveredProxies {
    pub fn len(&self) -> usize {
        self.plain.len() + self.tls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.tls.is_empty()
    }

    /// All endpoints, plain first, each group in page order.
    pub fn into_endpoints(self) -> Vec<ProxyEndpoint> {
        let mut endpoints = self.plain;
        endpoints.extend(self.tls);
        endpoints
    }
}

/// Extracts `address:port` pairs from a raw listing body.
///
/// Matching is best-effort: out-of-range octets or ports are skipped.
pub fn parse_proxy_list(body: &str) -> DiscoveredProxies {
    DiscoveredProxies {
        plain: extract(&PLAIN_PATTERN, body, ProxyScheme::Plain, |port| {
            !TLS_PORTS.contains(&port)
        }),
        tls: extract(&TLS_PATTERN, body, ProxyScheme::Tls, |_| true),
    }
}

fn extract(
    pattern: &Regex,
    body: &str,
    scheme: ProxyScheme,
    keep_port: impl Fn(u16) -> bool,
) -> Vec<ProxyEndpoint> {
    let mut seen = HashSet::new();
    pattern
        .captures_iter(body)
        .filter_map(|caps| endpoint_from_parts(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
        .filter(|endpoint| keep_port(endpoint.port))
        .map(|endpoint| endpoint.with_scheme(scheme))
        .filter(|endpoint| seen.insert(endpoint.clone()))
        .collect()
}

/// Discovers candidates from a fixed listing URL.
pub struct ProxySource {
    list_url: String,
    fetcher: Arc<dyn PageFetcher>,
}

impl ProxySource {
    pub fn new(list_url: impl Into<String>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            list_url: list_url.into(),
            fetcher,
        }
    }

    /// Fetches the listing page and returns the candidates split by scheme.
    ///
    /// Fails only when the page is unreachable or answers a non-success
    /// status; a page without any address yields an empty result.
    pub async fn discover_partitioned(&self) -> Result<DiscoveredProxies> {
        info!("Fetching proxies from {}", self.list_url);

        match self.fetcher.fetch(&self.list_url, &[]).await {
            FetchOutcome::Success(body) => {
                let found = parse_proxy_list(&body);
                debug!(
                    plain = found.plain.len(),
                    tls = found.tls.len(),
                    "Parsed proxy listing"
                );
                Ok(found)
            }
            other => Err(CrawlError::ProxyDiscovery(format!(
                "{}: {}",
                self.list_url, other
            ))),
        }
    }

    /// Fetches the listing page and returns every candidate.
    pub async fn discover(&self) -> Result<Vec<ProxyEndpoint>> {
        Ok(self.discover_partitioned().await?.into_endpoints())
    }
}

#[async_trait]
impl ProxyProvider for ProxySource {
    async fn fetch_proxies(&self) -> Result<Vec<ProxyEndpoint>> {
        self.discover().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    struct CannedFetcher(FetchOutcome);

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, _url: &str, _query: &[(&str, &str)]) -> FetchOutcome {
            self.0.clone()
        }
    }

    fn source(outcome: FetchOutcome) -> ProxySource {
        ProxySource::new("https://proxies.test/", Arc::new(CannedFetcher(outcome)))
    }

    #[test]
    fn test_parse_proxy_list_partitions_by_scheme() {
        let body = r#"
            <textarea class="form-control" readonly="readonly">
            Free proxies from free-proxy-list.net
            194.126.37.94:8080
            13.78.125.167:8080
            51.158.68.133:443
            </textarea>
        "#;
        let found = parse_proxy_list(body);
        assert_eq!(found.plain.len(), 2);
        assert_eq!(found.tls.len(), 1);
        assert_eq!(found.plain[0].to_string(), "194.126.37.94:8080");
        assert_eq!(found.plain[1].to_string(), "13.78.125.167:8080");
        assert_eq!(found.tls[0].to_string(), "51.158.68.133:443");
        assert!(found.plain.iter().all(|p| p.scheme == ProxyScheme::Plain));
        assert_eq!(found.tls[0].scheme, ProxyScheme::Tls);
    }

    #[test]
    fn test_parse_proxy_list_skips_malformed() {
        let body = "999.1.1.1:8080 1.2.3.4:99999 1.2.3.4: 5.6.7.8:3128";
        let found = parse_proxy_list(body);
        assert_eq!(found.into_endpoints(), vec![ProxyEndpoint::new("5.6.7.8", 3128)]);
    }

    #[test]
    fn test_parse_proxy_list_dedups() {
        let body = "1.2.3.4:80 1.2.3.4:80 1.2.3.4:443 1.2.3.4:443";
        let found = parse_proxy_list(body);
        assert_eq!(found.plain.len(), 1);
        assert_eq!(found.tls.len(), 1);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_parse_proxy_list_empty() {
        assert!(parse_proxy_list("").is_empty());
        assert!(parse_proxy_list("<html><body>nothing here</body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_discover_success() {
        let body = "10.1.1.1:3128\n10.1.1.2:8443".to_string();
        let endpoints = source(FetchOutcome::Success(body)).discover().await.unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].scheme, ProxyScheme::Plain);
        assert_eq!(endpoints[1].scheme, ProxyScheme::Tls);
    }

    #[tokio::test]
    async fn test_discover_unparseable_body_is_empty() {
        let source = source(FetchOutcome::Success("<html>...</html>".to_string()));
        assert!(source.fetch_proxies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discover_soft_failure_is_error() {
        let source = source(FetchOutcome::SoftFailure(StatusCode::SERVICE_UNAVAILABLE));
        let result = source.discover().await;
        assert!(matches!(result, Err(CrawlError::ProxyDiscovery(_))));
    }

    #[tokio::test]
    async fn test_discover_network_error_is_error() {
        let source = source(FetchOutcome::NetworkError("connection refused".to_string()));
        let result = source.discover().await;
        assert!(matches!(result, Err(CrawlError::ProxyDiscovery(_))));
    }
}
