//! Configuration module for shopcrawl
//!
//! All runtime options are sourced from the environment. Parsing is factored
//! through a lookup function so tests never mutate process environment.

use crate::{ConfigError, ConfigResult};
use std::time::Duration;

/// Which fetch backend to use for a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Plain HTTP fetch with static HTML parsing
    Static,
    /// Headless Chromium with scroll-triggered lazy-load expansion
    Browser,
}

impl BackendKind {
    /// Parses the `CRAWLER` selector. Unknown values fall back to the
    /// static backend with a warning rather than failing the run.
    fn from_selector(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "browser" => Self::Browser,
            "static" => Self::Static,
            other => {
                tracing::warn!("Unknown CRAWLER backend {:?}, using static", other);
                Self::Static
            }
        }
    }
}

/// Crawler configuration, one instance per process
#[derive(Debug, Clone)]
pub struct Config {
    /// Global cap on in-flight fetches across all domains
    pub concurrent_requests: usize,

    /// Cap on in-flight fetches within a single domain
    pub concurrent_requests_per_domain: usize,

    /// Politeness delay between fetches; also the scroll-settle wait
    /// for the rendered backend
    pub download_delay: Duration,

    /// Fetch backend selector
    pub backend: BackendKind,

    /// Whether the rendered backend launches Chromium headless
    pub headless: bool,

    /// Per-attempt fetch timeout
    pub fetch_timeout: Duration,

    /// Bounded retry count for transient fetch failures
    pub fetch_retries: u32,

    /// Maximum lazy-load expansion rounds per rendered page
    pub max_scroll_attempts: u32,

    /// Optional deadline for a whole domain task; expiry fails that
    /// domain without affecting siblings
    pub domain_deadline: Option<Duration>,

    /// Optional endpoint for external pattern suggestions
    pub pattern_suggest_url: Option<String>,
}

impl Config {
    /// Loads configuration from process environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            concurrent_requests: parse_var(&lookup, "CONCURRENT_REQUESTS", 10)?,
            concurrent_requests_per_domain: parse_var(
                &lookup,
                "CONCURRENT_REQUESTS_PER_DOMAIN",
                5,
            )?,
            download_delay: Duration::from_millis(parse_var(&lookup, "DOWNLOAD_DELAY", 100)?),
            backend: lookup("CRAWLER")
                .map(|v| BackendKind::from_selector(&v))
                .unwrap_or(BackendKind::Static),
            headless: parse_var(&lookup, "BROWSER_HEADLESS", true)?,
            fetch_timeout: Duration::from_millis(parse_var(&lookup, "FETCH_TIMEOUT", 20_000)?),
            fetch_retries: parse_var(&lookup, "FETCH_RETRIES", 3)?,
            max_scroll_attempts: parse_var(&lookup, "MAX_SCROLL_ATTEMPTS", 8)?,
            domain_deadline: parse_optional(&lookup, "DOMAIN_DEADLINE")?
                .map(Duration::from_millis),
            pattern_suggest_url: lookup("PATTERN_SUGGEST_URL").filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints
    fn validate(&self) -> ConfigResult<()> {
        if self.concurrent_requests == 0 {
            return Err(ConfigError::Validation(
                "CONCURRENT_REQUESTS must be at least 1".to_string(),
            ));
        }
        if self.concurrent_requests_per_domain == 0 {
            return Err(ConfigError::Validation(
                "CONCURRENT_REQUESTS_PER_DOMAIN must be at least 1".to_string(),
            ));
        }
        if self.fetch_retries == 0 {
            return Err(ConfigError::Validation(
                "FETCH_RETRIES must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrent_requests: 10,
            concurrent_requests_per_domain: 5,
            download_delay: Duration::from_millis(100),
            backend: BackendKind::Static,
            headless: true,
            fetch_timeout: Duration::from_millis(20_000),
            fetch_retries: 3,
            max_scroll_attempts: 8,
            domain_deadline: None,
            pattern_suggest_url: None,
        }
    }
}

/// Parses one variable, falling back to a default when unset
fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            }),
        None => Ok(default),
    }
}

/// Parses one optional variable; unset yields None
fn parse_optional<F, T>(lookup: &F, var: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}
