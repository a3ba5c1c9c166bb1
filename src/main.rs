//! Shopcrawl main entry point
//!
//! Command-line interface for the product URL crawler: run the HTTP API
//! server, or crawl a list of domains directly and print JSON.

use clap::{Parser, Subcommand};
use shopcrawl::config::{BackendKind, Config};
use shopcrawl::crawler::crawl_domains;
use shopcrawl::fetch::{
    build_http_client, BrowserFetcherFactory, FetcherFactory, HttpFetcherFactory,
};
use shopcrawl::patterns::{DefaultPatternSource, PatternSource, RemotePatternSource};
use shopcrawl::server::{self, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shopcrawl: an e-commerce product URL crawler
///
/// Shopcrawl walks a store's internal link graph, recognizes product
/// detail pages by URL pattern, and reports the product URLs it finds
/// per domain. Both a one-shot CLI mode and an HTTP API are available.
#[derive(Parser, Debug)]
#[command(name = "shopcrawl")]
#[command(version = "1.0.0")]
#[command(about = "An e-commerce product URL crawler", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
    /// Crawl the given domains and print the results as JSON
    Crawl {
        /// Domains to crawl, e.g. example.com or https://example.com
        #[arg(required = true, value_name = "DOMAIN")]
        domains: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!(
        "Using {:?} backend, {} global / {} per-domain request slots",
        config.backend,
        config.concurrent_requests,
        config.concurrent_requests_per_domain
    );

    let factory = build_factory(&config)?;
    let patterns = build_pattern_source(&config);

    match cli.command {
        Command::Serve { port } => {
            let state = AppState {
                config,
                patterns,
                factory,
            };
            server::serve(state, port).await?;
        }
        Command::Crawl { domains } => {
            let set = patterns.patterns_for(&domains).await;
            let results = crawl_domains(config, factory, &set, &domains).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

/// Picks the fetch backend the configuration asks for
fn build_factory(config: &Arc<Config>) -> shopcrawl::Result<Arc<dyn FetcherFactory>> {
    Ok(match config.backend {
        BackendKind::Static => Arc::new(HttpFetcherFactory::new(Arc::clone(config))?),
        BackendKind::Browser => Arc::new(BrowserFetcherFactory::new(Arc::clone(config))),
    })
}

/// Remote pattern suggestions when an endpoint is configured, defaults otherwise
fn build_pattern_source(config: &Arc<Config>) -> Arc<dyn PatternSource> {
    match &config.pattern_suggest_url {
        Some(endpoint) => match build_http_client(config.fetch_timeout) {
            Ok(client) => Arc::new(RemotePatternSource::new(
                client,
                endpoint.clone(),
                config.fetch_timeout,
            )),
            Err(e) => {
                tracing::warn!("Pattern service client failed to build: {}", e);
                Arc::new(DefaultPatternSource)
            }
        },
        None => Arc::new(DefaultPatternSource),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shopcrawl=info,warn"),
            1 => EnvFilter::new("shopcrawl=debug,info"),
            2 => EnvFilter::new("shopcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
