//! Concurrent liveness probing of candidate proxies.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::proxy::{ProxyEndpoint, ValidatedProxy};

/// Probes candidates through a fixed reachability endpoint.
#[derive(Debug, Clone)]
pub struct ProxyValidator {
    probe_url: String,
    probe_timeout: Duration,
}

impl ProxyValidator {
    pub fn new(probe_url: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe_url: probe_url.into(),
            probe_timeout,
        }
    }

    /// Probes every candidate at once and returns the ones that answered a
    /// success status within the per-probe budget, in input order.
    pub async fn validate(&self, candidates: Vec<ProxyEndpoint>) -> Vec<ValidatedProxy> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let probes = candidates.iter().map(|candidate| self.probe(candidate));
        let verdicts = join_all(probes).await;

        let valid: Vec<ValidatedProxy> = candidates
            .into_iter()
            .zip(verdicts)
            .filter_map(|(candidate, ok)| ok.then(|| ValidatedProxy::new(candidate)))
            .collect();

        info!("{} valid proxies found", valid.len());
        valid
    }

    /// Probes one candidate. Any error, timeout or non-success status is `false`.
    pub async fn probe(&self, candidate: &ProxyEndpoint) -> bool {
        let client = match candidate.to_reqwest().and_then(|proxy| {
            Client::builder()
                .proxy(proxy)
                .timeout(self.probe_timeout)
                .pool_max_idle_per_host(0)
                .build()
                .map_err(Into::into)
        }) {
            Ok(client) => client,
            Err(e) => {
                debug!("Cannot build client for proxy {}: {}", candidate, e);
                return false;
            }
        };

        match timeout(self.probe_timeout, client.get(&self.probe_url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => {
                info!("Proxy {} is working", candidate);
                true
            }
            Ok(Ok(response)) => {
                debug!("Proxy {} answered {}", candidate, response.status());
                false
            }
            Ok(Err(e)) => {
                debug!("Proxy {} failed: {}", candidate, e);
                false
            }
            Err(_) => {
                debug!("Proxy {} timed out", candidate);
                false
            }
        }
    }
}

impl Default for ProxyValidator {
    fn default() -> Self {
        Self::new("http://www.gstatic.com/generate_204", Duration::from_secs(5))
    }
}
