//! Integration tests against the live site and proxy listing.
//!
//! These tests are marked with `#[ignore]` by default because they require
//! network access and may be slow or flaky (rate limiting, dead proxies).
//!
//! Run with: `cargo test --test integration -- --ignored`

use tokio_util::sync::CancellationToken;

use github_crawlee::proxy::{ProxyPool, StaticProxyProvider};
use github_crawlee::{build_proxy_pool, run, CrawlSettings, FetchSpec, SearchType};

fn settings() -> CrawlSettings {
    CrawlSettings {
        delay_min_ms: 0,
        delay_max_ms: 0,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn test_live_repository_search() {
    let spec = FetchSpec::new(vec!["tokio".to_string()], SearchType::Repositories);
    let output = run(&spec, &ProxyPool::new(), &settings(), CancellationToken::new())
        .await
        .unwrap();

    let results = &output["tokio"];
    println!("'tokio' returned {} results", results.len());
    for result in results.iter().take(3) {
        println!("  {}", result.url);
    }
    assert!(results.iter().all(|r| r.url.starts_with("https://github.com/")));
}

#[tokio::test]
#[ignore]
async fn test_live_repository_search_with_detail() {
    let spec = FetchSpec::new(vec!["ripgrep".to_string()], SearchType::Repositories).with_detail(true);
    let output = run(&spec, &ProxyPool::new(), &settings(), CancellationToken::new())
        .await
        .unwrap();

    for result in output["ripgrep"].iter().take(3) {
        println!("  {} -> {:?}", result.url, result.detail);
    }
}

#[tokio::test]
#[ignore]
async fn test_live_proxy_discovery() {
    let pool = build_proxy_pool(&StaticProxyProvider::new(Vec::new()), &settings()).await;
    println!("Discovered {} working proxies", pool.len());
    for proxy in pool.proxies().iter().take(5) {
        println!("  {}", proxy);
    }
}
