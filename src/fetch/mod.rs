//! Fetch/render adapter boundary
//!
//! This module defines the contract between the crawl engine and whatever
//! retrieves page content: a static HTTP backend and a rendered (headless
//! Chromium) backend, both returning the page content plus the raw outbound
//! hrefs it contains. Retry policy lives behind this boundary; the engine
//! only ever sees the final outcome of a fetch.

mod browser;
mod parser;
mod static_fetch;

pub use browser::{BrowserFetcher, BrowserFetcherFactory};
pub use parser::extract_hrefs;
pub use static_fetch::{HttpFetcher, HttpFetcherFactory};

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Delay between retry attempts for transient failures
pub(crate) const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// User agent presented by both backends
pub(crate) const USER_AGENT: &str = concat!("shopcrawl/", env!("CARGO_PKG_VERSION"));

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw page content (rendered HTML for the browser backend)
    pub content: String,

    /// Raw outbound hrefs exactly as found in the page
    pub hrefs: Vec<String>,
}

/// Final failure of a fetch, after the retry budget is spent
#[derive(Debug, Error)]
#[error("{kind} (after {attempts} attempt(s))")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub attempts: u32,
}

/// Classification of an individual fetch attempt failure
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("non-HTML content type: {0}")]
    ContentType(String),

    #[error("browser error: {0}")]
    Browser(String),
}

impl FetchErrorKind {
    /// Whether another attempt could plausibly succeed
    ///
    /// Timeouts, connection-level failures, and non-2xx responses are
    /// retried; a content-type mismatch is a property of the resource and
    /// is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) | Self::Browser(_) | Self::Status(_) => true,
            Self::ContentType(_) => false,
        }
    }
}

/// Retrieves a single page's content and outbound hrefs
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one URL, retrying transient failures up to the configured
    /// bound. The returned error is the final one, carrying the attempt
    /// count.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Opens a fetcher for one domain's crawl task
///
/// Construction failure here (for example a browser that will not launch)
/// is the domain-fatal error class: it fails that domain's crawl and
/// nothing else.
#[async_trait]
pub trait FetcherFactory: Send + Sync {
    async fn open(&self, domain: &str) -> crate::Result<Arc<dyn PageFetcher>>;
}

/// Builds the shared HTTP client used by the static backend
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
