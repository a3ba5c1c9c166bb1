//! Product-URL classification
//!
//! A URL is a product URL iff it matches at least one regex in the active
//! pattern set (unanchored substring semantics). The pattern set is fixed
//! for the duration of one crawl run.

mod source;

pub use source::{DefaultPatternSource, PatternSource, RemotePatternSource};

use regex::{Regex, RegexSet};
use url::Url;

/// Patterns used when no external suggestion is available (or usable)
pub const DEFAULT_PRODUCT_PATTERNS: &[&str] =
    &["/product/", "/item/", "/p/", "/proddetail/", "/products/"];

/// An ordered collection of regex sources for product-URL classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet(Vec<String>);

impl PatternSet {
    pub fn new(patterns: Vec<String>) -> Self {
        Self(patterns)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for PatternSet {
    /// The built-in default set
    fn default() -> Self {
        Self(
            DEFAULT_PRODUCT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }
}

/// Compiled product-URL classifier
///
/// Construction never fails: patterns that do not compile are discarded
/// with a warning, and an empty surviving set falls back to the defaults,
/// so classification always runs against a non-empty pattern set.
#[derive(Debug)]
pub struct ProductClassifier {
    set: RegexSet,
}

impl ProductClassifier {
    pub fn new(patterns: &PatternSet) -> Self {
        let mut valid: Vec<&str> = Vec::with_capacity(patterns.len());
        for pattern in patterns.iter() {
            match Regex::new(pattern) {
                Ok(_) => valid.push(pattern),
                Err(e) => {
                    tracing::warn!("Discarding invalid product pattern {:?}: {}", pattern, e);
                }
            }
        }

        if valid.is_empty() {
            tracing::warn!("No usable product patterns supplied, using defaults");
            valid = DEFAULT_PRODUCT_PATTERNS.to_vec();
        }

        // Every member compiled individually above
        let set = RegexSet::new(&valid).unwrap_or_else(|_| RegexSet::empty());

        Self { set }
    }

    /// Tests whether a normalized URL is a product URL
    ///
    /// Deterministic for a fixed pattern set; pattern order never changes
    /// the boolean result.
    pub fn is_product(&self, url: &Url) -> bool {
        self.set.is_match(url.as_str())
    }

    /// Number of active patterns
    pub fn pattern_count(&self) -> usize {
        self.set.len()
    }
}

impl Default for ProductClassifier {
    fn default() -> Self {
        Self::new(&PatternSet::default())
    }
}
