//! URL handling module for shopcrawl
//!
//! This module provides href normalization against a domain root, same-site
//! matching, and the crawlability filter used to keep non-document resources
//! out of the frontier.

mod filter;
mod normalize;

use url::Url;

// Re-export main functions
pub use filter::is_crawlable;
pub use normalize::{normalize_href, normalize_root};

/// Checks whether two URLs belong to the same site
///
/// Hosts are compared with the leading `www.` label ignored, as an exact
/// label rather than a substring, so `www.example.com` matches `example.com`
/// but `wwwx.example.com` does not. Ports must match (scheme-default ports
/// included).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shopcrawl::url::same_site;
///
/// let root = Url::parse("https://shop.example").unwrap();
/// let a = Url::parse("https://www.shop.example/p/1").unwrap();
/// let b = Url::parse("https://other.com/p/1").unwrap();
/// assert!(same_site(&root, &a));
/// assert!(!same_site(&root, &b));
/// ```
pub fn same_site(root: &Url, candidate: &Url) -> bool {
    let (Some(root_host), Some(cand_host)) = (root.host_str(), candidate.host_str()) else {
        return false;
    };

    if root.port_or_known_default() != candidate.port_or_known_default() {
        return false;
    }

    strip_www_label(&root_host.to_lowercase()) == strip_www_label(&cand_host.to_lowercase())
}

/// Removes a leading `www.` label from a host, as an exact label only
fn strip_www_label(host: &str) -> &str {
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => host,
    }
}
