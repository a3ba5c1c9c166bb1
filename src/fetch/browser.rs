//! Rendered fetch backend (headless Chromium)
//!
//! Pages that build their catalog with JavaScript or infinite scroll are
//! invisible to the static backend. This backend drives a real browser:
//! navigate, trigger lazy loading by scrolling until the document height
//! stabilizes (bounded by `MAX_SCROLL_ATTEMPTS`), then read the rendered
//! DOM and extract hrefs from it.

use crate::config::Config;
use crate::fetch::{
    extract_hrefs, FetchError, FetchErrorKind, FetchedPage, FetcherFactory, PageFetcher,
    RETRY_BACKOFF,
};
use crate::CrawlError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Page fetcher backed by one Chromium instance
pub struct BrowserFetcher {
    browser: Browser,
    handler_task: JoinHandle<()>,
    timeout: Duration,
    retries: u32,
    scroll_delay: Duration,
    max_scroll_attempts: u32,
}

impl BrowserFetcher {
    /// Launches a browser instance
    ///
    /// Launch failure is domain-fatal: the caller fails that domain's
    /// crawl and leaves every other domain untouched.
    pub async fn launch(config: &Config) -> crate::Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(CrawlError::BackendInit)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CrawlError::BackendInit(e.to_string()))?;

        // The handler is the CDP event loop; it must be polled for the
        // browser connection to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            timeout: config.fetch_timeout,
            retries: config.fetch_retries.max(1),
            scroll_delay: config.download_delay,
            max_scroll_attempts: config.max_scroll_attempts,
        })
    }

    /// One render attempt; the caller owns the retry policy and timeout
    async fn attempt(&self, url: &str) -> Result<FetchedPage, FetchErrorKind> {
        let page = self.browser.new_page(url).await.map_err(browser_err)?;
        let result = self.render(&page).await;
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }
        result
    }

    async fn render(&self, page: &Page) -> Result<FetchedPage, FetchErrorKind> {
        page.wait_for_navigation().await.map_err(browser_err)?;
        self.expand_lazy_content(page).await?;

        let content = page.content().await.map_err(browser_err)?;
        let hrefs = extract_hrefs(&content);

        Ok(FetchedPage { content, hrefs })
    }

    /// Bounded scroll-triggered content expansion
    ///
    /// Scrolls to the bottom, waits for lazy content, and stops once
    /// the document height stabilizes or the attempt bound is reached.
    /// This turns an otherwise unbounded infinite-scroll page into a
    /// fixed number of expansion rounds.
    async fn expand_lazy_content(&self, page: &Page) -> Result<(), FetchErrorKind> {
        let mut last_height: i64 = -1;

        for round in 0..self.max_scroll_attempts {
            let height: i64 = page
                .evaluate("document.body.scrollHeight")
                .await
                .map_err(browser_err)?
                .into_value()
                .map_err(browser_err)?;

            if height == last_height {
                tracing::trace!("Document height stable after {} scroll round(s)", round);
                break;
            }
            last_height = height;

            page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .map_err(browser_err)?;

            tokio::time::sleep(self.scroll_delay).await;
        }

        Ok(())
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        // Stop the event loop; the browser process goes down with the
        // Browser handle itself
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let outcome = match tokio::time::timeout(self.timeout, self.attempt(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchErrorKind::Timeout),
            };

            match outcome {
                Ok(page) => return Ok(page),
                Err(kind) => {
                    if kind.is_transient() && attempts < self.retries {
                        tracing::debug!(
                            "Transient render failure for {} (attempt {}): {}",
                            url,
                            attempts,
                            kind
                        );
                        tokio::time::sleep(RETRY_BACKOFF).await;
                        continue;
                    }
                    return Err(FetchError { kind, attempts });
                }
            }
        }
    }
}

fn browser_err<E: std::fmt::Display>(error: E) -> FetchErrorKind {
    FetchErrorKind::Browser(error.to_string())
}

/// Factory for the rendered backend: one browser launch per domain, so a
/// crashed or unlaunchable browser is contained to its own domain
pub struct BrowserFetcherFactory {
    config: Arc<Config>,
}

impl BrowserFetcherFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FetcherFactory for BrowserFetcherFactory {
    async fn open(&self, domain: &str) -> crate::Result<Arc<dyn PageFetcher>> {
        tracing::info!("Launching browser for {}", domain);
        let fetcher = BrowserFetcher::launch(&self.config).await?;
        Ok(Arc::new(fetcher))
    }
}
