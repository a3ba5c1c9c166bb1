//! Href extraction from fetched HTML
//!
//! Both backends feed their page content through this extractor. It returns
//! raw href strings; resolution, same-site filtering, and deduplication are
//! the normalizer's job.

use scraper::{Html, Selector};

/// Extracts raw outbound hrefs from an HTML document
///
/// **Include:** `<a href="...">` anywhere in the document.
///
/// **Exclude:**
/// - `<a href="..." download>` (file downloads, not navigation)
/// - `<link>`, `<script src>`, `<img src>` (not navigational)
/// - empty hrefs
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut hrefs = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    hrefs.push(href.to_string());
                }
            }
        }
    }

    hrefs
}
