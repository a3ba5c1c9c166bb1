use crate::url::same_site;
use crate::UrlError;
use url::Url;

/// Query parameters dropped during normalization (tracking noise that would
/// otherwise make equal pages look distinct)
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Schemes that never lead to a crawlable document
const SKIP_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a raw href against its owning domain root
///
/// The result is the canonical form used as the sole deduplication key.
/// Returns `None` when the href is unusable or resolves off-site.
///
/// # Normalization Steps
///
/// 1. Reject empty, fragment-only, and non-navigational hrefs
///    (`javascript:`, `mailto:`, `tel:`, `data:`)
/// 2. Resolve protocol-relative (`//host/path`) using the root's scheme
/// 3. Resolve root-relative and relative forms against the root
/// 4. Require http/https and a host on the same site as the root
/// 5. Rebuild on the root's scheme and authority (never the href's own)
/// 6. Strip the fragment
/// 7. Normalize the path: collapse duplicate slashes, drop dot segments,
///    strip the trailing slash (root `/` kept)
/// 8. Drop tracking query parameters and sort the remainder; an empty
///    query is removed entirely
///
/// Idempotent: normalizing an already-normalized URL yields the same string.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shopcrawl::url::normalize_href;
///
/// let root = Url::parse("https://shop.example").unwrap();
/// let url = normalize_href(&root, "/product/123/").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example/product/123");
/// ```
pub fn normalize_href(root: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Step 1: unusable hrefs
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if SKIP_SCHEMES.iter().any(|s| href.starts_with(s)) {
        return None;
    }

    // Steps 2-3: resolution
    let resolved = if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("{}://{}", root.scheme(), rest)).ok()?
    } else {
        root.join(href).ok()?
    };

    // Step 4: scheme and site checks
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    if !same_site(root, &resolved) {
        return None;
    }

    // Step 5: rebuild on the root's scheme and authority
    let mut out = root.clone();
    out.set_path(&normalize_path(resolved.path()));

    // Step 6: fragment
    out.set_fragment(None);

    // Step 8: query
    out.set_query(None);
    if resolved.query().is_some() {
        let params = filter_and_sort_query_params(&resolved);
        if !params.is_empty() {
            let query_string = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            out.set_query(Some(&query_string));
        }
    }

    Some(out)
}

/// Canonicalizes a domain given as crawl input
///
/// Accepts bare hosts (`shop.example`) and full URLs; a missing scheme
/// defaults to https. Failure here is fatal for that domain only.
pub fn normalize_root(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty domain".to_string()));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
    }
    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    // Self-normalize so the root obeys the same canonical form as every
    // other URL in the frontier
    normalize_href(&parsed, parsed.as_str())
        .ok_or_else(|| UrlError::Parse(format!("cannot canonicalize {}", raw)))
}

/// Normalizes a URL path: collapses slashes, drops dot segments, and strips
/// the trailing slash (root `/` kept)
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
