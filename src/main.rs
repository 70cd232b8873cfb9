//! github-crawlee CLI - crawls GitHub search results listed in an input file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use github_crawlee::proxy::StaticProxyProvider;
use github_crawlee::{build_proxy_pool, run, write_output, CrawlInput};

/// github-crawlee - proxy-aware GitHub search crawler
#[derive(Parser)]
#[command(name = "github-crawlee")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file with keywords, search type and options
    #[arg(short, long, default_value = "input.json")]
    input: PathBuf,

    /// File the results are written to
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting GitHub crawler...");

    let input = match CrawlInput::load(&cli.input).await {
        Ok(input) => input,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let settings = input.settings.clone();
    let supplied = StaticProxyProvider::new(input.proxy_candidates()?);
    let pool = build_proxy_pool(&supplied, &settings).await;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received");
            on_signal.cancel();
        }
    });

    let output = run(&input.fetch_spec(), &pool, &settings, cancel).await?;

    write_output(&cli.output, &output).await?;
    info!("Data successfully saved to {}", cli.output.display());

    Ok(())
}
