//! Proxy endpoints and the per-run pool of validated proxies.
//!
//! Endpoints are discovered or supplied, probed by the validator, and the
//! survivors are collected into a [`ProxyPool`] that is handed to the crawler
//! by value. Nothing here is cached between runs.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Proxy as ReqwestProxy;

use crate::{CrawlError, Result};

/// Ports conventionally used by proxies that tunnel TLS traffic.
pub const TLS_PORTS: [u16; 2] = [443, 8443];

/// Traffic a proxy endpoint was advertised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProxyScheme {
    /// Plain HTTP proxy.
    #[default]
    Plain,
    /// Proxy on a TLS-conventional port.
    Tls,
}

impl ProxyScheme {
    /// Classifies a port.
    pub fn for_port(port: u16) -> Self {
        if TLS_PORTS.contains(&port) {
            ProxyScheme::Tls
        } else {
            ProxyScheme::Plain
        }
    }
}

/// A single candidate proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    /// Proxy host (IP or domain)
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Advertised scheme
    pub scheme: ProxyScheme,
}

impl ProxyEndpoint {
    /// Creates an endpoint, classifying the scheme from the port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: ProxyScheme::for_port(port),
        }
    }

    /// Overrides the scheme.
    pub fn with_scheme(mut self, scheme: ProxyScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Returns the proxy URL string.
    ///
    /// Both schemes are spoken to as HTTP proxies; TLS traffic is tunnelled
    /// with CONNECT.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Builds a reqwest proxy routing all traffic through this endpoint.
    pub fn to_reqwest(&self) -> Result<ReqwestProxy> {
        ReqwestProxy::all(self.url())
            .map_err(|e| CrawlError::Other(format!("Failed to create proxy {}: {}", self, e)))
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = CrawlError;

    /// Parses `host:port`, with or without an `http://` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix("http://")
            .or_else(|| s.strip_prefix("https://"))
            .unwrap_or(s)
            .trim_end_matches('/');

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CrawlError::Parse(format!("missing port in '{}'", s)))?;
        if host.is_empty() {
            return Err(CrawlError::Parse(format!("missing host in '{}'", s)));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| CrawlError::Parse(format!("invalid port in '{}'", s)))?;
        if port == 0 {
            return Err(CrawlError::Parse(format!("invalid port in '{}'", s)));
        }

        Ok(ProxyEndpoint::new(host, port))
    }
}

/// Parses a dotted-quad address and port captured by a pattern.
///
/// Returns `None` for out-of-range octets or ports.
pub(crate) fn endpoint_from_parts(ip: &str, port: &str) -> Option<ProxyEndpoint> {
    let ip: Ipv4Addr = ip.parse().ok()?;
    let port: u16 = port.parse().ok()?;
    if port == 0 {
        return None;
    }
    Some(ProxyEndpoint::new(ip.to_string(), port))
}

/// A proxy that passed a liveness probe during the current run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedProxy(ProxyEndpoint);

impl ValidatedProxy {
    pub(crate) fn new(endpoint: ProxyEndpoint) -> Self {
        Self(endpoint)
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.0
    }

    pub fn into_endpoint(self) -> ProxyEndpoint {
        self.0
    }
}

impl fmt::Display for ValidatedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validated proxies available to one run.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<ValidatedProxy>,
}

impl ProxyPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from validator output.
    pub fn from_validated(proxies: Vec<ValidatedProxy>) -> Self {
        Self { proxies }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn proxies(&self) -> &[ValidatedProxy] {
        &self.proxies
    }

    /// Picks one proxy uniformly at random.
    pub fn choose(&self) -> Option<&ValidatedProxy> {
        self.proxies.choose(&mut rand::thread_rng())
    }
}

/// Source of candidate proxies.
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// Fetches a list of candidate proxies.
    async fn fetch_proxies(&self) -> Result<Vec<ProxyEndpoint>>;
}

/// A provider returning a fixed list, e.g. proxies supplied in the input.
pub struct StaticProxyProvider {
    proxies: Vec<ProxyEndpoint>,
}

impl StaticProxyProvider {
    pub fn new(proxies: Vec<ProxyEndpoint>) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl ProxyProvider for StaticProxyProvider {
    async fn fetch_proxies(&self) -> Result<Vec<ProxyEndpoint>> {
        Ok(self.proxies.clone())
    }
}
