//! Shopcrawl: a product-URL discovery crawler
//!
//! This crate crawls the internal link graph of many independent e-commerce
//! domains concurrently and classifies discovered URLs as product-detail
//! pages via pattern matching. Each domain is crawled in isolation; one
//! domain failing never affects another.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod patterns;
pub mod server;
pub mod url;

use thiserror::Error;

/// Main error type for shopcrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Backend initialization failed: {0}")]
    BackendInit(String),

    #[error("Domain list is empty")]
    EmptyDomainList,

    #[error("Domain task deadline exceeded for {domain}")]
    DeadlineExceeded { domain: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for shopcrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{BackendKind, Config};
pub use crawler::{crawl_domains, AdmissionGates, DomainFrontier};
pub use patterns::{PatternSet, PatternSource, ProductClassifier};
pub use url::{is_crawlable, normalize_href, normalize_root, same_site};
