use url::Url;

/// Extensions that never point at a crawlable HTML document
///
/// Matched case-insensitively against the end of the URL path; the query
/// string is never consulted.
const SKIP_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif",
    // Video
    "mp4", "webm", "avi", "mov", "mkv", "flv", "wmv",
    // Audio
    "mp3", "wav", "ogg", "flac", "aac", "m4a",
    // Archives
    "zip", "tar", "gz", "bz2", "xz", "rar", "7z",
    // Executables and images of disks
    "exe", "msi", "dmg", "bin", "iso", "apk",
    // Stylesheets and scripts
    "css", "js", "mjs", "map",
    // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // Data files
    "json", "xml", "csv", "rss", "atom",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

/// Returns true when a normalized URL points at a fetchable document
///
/// Pure predicate over the URL path; no network access, no side effects.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shopcrawl::url::is_crawlable;
///
/// assert!(is_crawlable(&Url::parse("https://shop.example/product/1").unwrap()));
/// assert!(!is_crawlable(&Url::parse("https://shop.example/catalog.jpg").unwrap()));
/// ```
pub fn is_crawlable(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();

    !SKIP_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}
