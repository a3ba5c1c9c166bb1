//! Static HTTP fetch backend
//!
//! Fetches pages with a shared reqwest client and extracts hrefs from the
//! raw response body. This is the default backend; it sees only what the
//! server sends, with no script execution.

use crate::config::Config;
use crate::fetch::{
    build_http_client, extract_hrefs, FetchError, FetchErrorKind, FetchedPage, FetcherFactory,
    PageFetcher, RETRY_BACKOFF,
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Plain HTTP page fetcher
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retries: u32,
    delay: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            timeout: config.fetch_timeout,
            retries: config.fetch_retries.max(1),
            delay: config.download_delay,
        }
    }

    /// One fetch attempt; the caller owns the retry policy
    async fn attempt(&self, url: &str) -> Result<FetchedPage, FetchErrorKind> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchErrorKind::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // A missing header is assumed HTML; anything explicitly non-HTML
        // is not worth downloading
        if !content_type.is_empty() && !content_type.contains("text/html") {
            return Err(FetchErrorKind::ContentType(content_type));
        }

        let body = response.text().await.map_err(classify_reqwest_error)?;
        let hrefs = extract_hrefs(&body);

        Ok(FetchedPage {
            content: body,
            hrefs,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            // Politeness delay before every request to the site
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.attempt(url).await {
                Ok(page) => return Ok(page),
                Err(kind) => {
                    if kind.is_transient() && attempts < self.retries {
                        tracing::debug!(
                            "Transient fetch failure for {} (attempt {}): {}",
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

/// Maps a reqwest error onto the fetch taxonomy
fn classify_reqwest_error(error: reqwest::Error) -> FetchErrorKind {
    if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() {
        FetchErrorKind::Network(format!("connection failed: {}", error))
    } else {
        FetchErrorKind::Network(error.to_string())
    }
}

/// Factory for the static backend: one shared client, one cheap fetcher
/// handle per domain
pub struct HttpFetcherFactory {
    client: Client,
    config: Arc<Config>,
}

impl HttpFetcherFactory {
    pub fn new(config: Arc<Config>) -> crate::Result<Self> {
        let client = build_http_client(config.fetch_timeout)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl FetcherFactory for HttpFetcherFactory {
    async fn open(&self, _domain: &str) -> crate::Result<Arc<dyn PageFetcher>> {
        Ok(Arc::new(HttpFetcher::new(
            self.client.clone(),
            &self.config,
        )))
    }
}
