//! Pattern sources
//!
//! A pattern source supplies the classification pattern set for a crawl
//! run, optionally augmented by an external suggestion service. Sources
//! are fail-open: no failure may escape this boundary, and classification
//! never depends on augmentation succeeding.

use crate::patterns::PatternSet;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Supplies the pattern set used to classify product URLs
#[async_trait]
pub trait PatternSource: Send + Sync {
    /// Returns the pattern set to use for the given domains
    ///
    /// Must always return a non-empty set; implementations degrade to
    /// [`PatternSet::default`] rather than erroring.
    async fn patterns_for(&self, domains: &[String]) -> PatternSet;
}

/// Pattern source that always returns the built-in defaults
#[derive(Debug, Default)]
pub struct DefaultPatternSource;

#[async_trait]
impl PatternSource for DefaultPatternSource {
    async fn patterns_for(&self, _domains: &[String]) -> PatternSet {
        PatternSet::default()
    }
}

/// Expected shape of a suggestion response
#[derive(Debug, Deserialize)]
struct SuggestResponse {
    patterns: Vec<String>,
}

/// Pattern source backed by an external suggestion endpoint
///
/// POSTs `{"domains": [...]}` and expects `{"patterns": [...]}` back. Any
/// transport failure, non-2xx status, or malformed body is logged and the
/// defaults are returned instead.
pub struct RemotePatternSource {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemotePatternSource {
    pub fn new(client: reqwest::Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    async fn suggest(&self, domains: &[String]) -> Result<PatternSet, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "domains": domains }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("suggestion endpoint returned {}", response.status()));
        }

        let parsed: SuggestResponse = response.json().await.map_err(|e| e.to_string())?;
        if parsed.patterns.is_empty() {
            return Err("suggestion response contained no patterns".to_string());
        }

        Ok(PatternSet::new(parsed.patterns))
    }
}

#[async_trait]
impl PatternSource for RemotePatternSource {
    async fn patterns_for(&self, domains: &[String]) -> PatternSet {
        match self.suggest(domains).await {
            Ok(set) => {
                tracing::info!(
                    "Using {} suggested product patterns from {}",
                    set.len(),
                    self.endpoint
                );
                set
            }
            Err(reason) => {
                tracing::warn!(
                    "Pattern suggestion failed ({}), falling back to defaults",
                    reason
                );
                PatternSet::default()
            }
        }
    }
}
