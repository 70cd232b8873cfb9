//! HTTP sessions built on reqwest, direct or bound to one proxy.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION};
use reqwest::Client;
use tracing::{debug, warn};

use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::proxy::{ProxyPool, ValidatedProxy};
use crate::{CrawlError, Result};

/// User-agent strings one session picks from.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.63 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.138 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:40.0) Gecko/20100101 Firefox/40.0",
];

const ACCEPT_HEADER: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A page fetcher over one reqwest client with a fixed header profile.
pub struct HttpSession {
    client: Client,
    user_agent: &'static str,
    proxy: Option<ValidatedProxy>,
}

impl HttpSession {
    pub fn user_agent(&self) -> &str {
        self.user_agent
    }

    /// The proxy every request of this session goes through, if any.
    pub fn proxy(&self) -> Option<&ValidatedProxy> {
        self.proxy.as_ref()
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }
}

#[async_trait]
impl PageFetcher for HttpSession {
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> FetchOutcome {
        let response = match self.client.get(url).query(query).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::NetworkError(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::SoftFailure(status);
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => FetchOutcome::NetworkError(e.to_string()),
        }
    }

    fn describe(&self) -> String {
        match &self.proxy {
            Some(proxy) => format!("proxy {}", proxy),
            None => "direct".to_string(),
        }
    }
}

/// Builds outbound sessions.
///
/// Every session disables TLS certificate verification so that traffic
/// through intercepting free proxies still completes. This is a known trust
/// trade-off: responses cannot be authenticated.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    timeout: Duration,
}

impl SessionFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Creates a session, bound to one random proxy from `pool` when
    /// `use_proxy` is set and the pool is non-empty.
    pub fn create_session(&self, use_proxy: bool, pool: &ProxyPool) -> Result<HttpSession> {
        let proxy = if use_proxy {
            let chosen = pool.choose().cloned();
            if chosen.is_none() {
                warn!("Proxied session requested but no validated proxies; using a direct connection");
            }
            chosen
        } else {
            None
        };

        self.build(proxy)
    }

    /// Creates a session routed through `proxy`, or a direct one for `None`.
    pub fn build(&self, proxy: Option<ValidatedProxy>) -> Result<HttpSession> {
        let user_agent = *USER_AGENTS
            .choose(&mut rand::thread_rng())
            .unwrap_or(&USER_AGENTS[0]);

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers())
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout);

        match &proxy {
            Some(proxy) => {
                debug!("Using proxy: {}", proxy);
                builder = builder.proxy(proxy.endpoint().to_reqwest()?);
            }
            // System proxy variables must not silently reroute a direct session.
            None => builder = builder.no_proxy(),
        }

        let client = builder
            .build()
            .map_err(|e| CrawlError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpSession {
            client,
            user_agent,
            proxy,
        })
    }
}

impl Default for SessionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}
