//! Crawl orchestration
//!
//! The orchestrator spawns one isolated task per domain and drives each
//! domain's frontier to exhaustion in rounds: snapshot the pending set,
//! fetch the whole batch concurrently under the admission gates, merge
//! the findings, repeat until a round comes up empty. Results aggregate
//! into one map only after every domain has finished or failed.

use crate::config::Config;
use crate::crawler::{AdmissionGates, DomainFrontier};
use crate::fetch::FetcherFactory;
use crate::patterns::{PatternSet, ProductClassifier};
use crate::url::{is_crawlable, normalize_href, normalize_root};
use crate::CrawlError;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Crawls every domain and aggregates discovered product URLs
///
/// Each domain runs in its own task under the shared global gate. A
/// failing domain — unparseable root, backend that will not initialize,
/// expired deadline, even a panic — contributes an empty product set and
/// neither cancels nor delays its siblings.
///
/// # Errors
///
/// Only input validation fails the run as a whole: an empty domain list
/// returns [`CrawlError::EmptyDomainList`] before any crawling starts.
pub async fn crawl_domains(
    config: Arc<Config>,
    factory: Arc<dyn FetcherFactory>,
    patterns: &PatternSet,
    domains: &[String],
) -> crate::Result<HashMap<String, Vec<String>>> {
    if domains.is_empty() {
        return Err(CrawlError::EmptyDomainList);
    }

    let classifier = Arc::new(ProductClassifier::new(patterns));
    let global_gate = Arc::new(Semaphore::new(config.concurrent_requests));

    tracing::info!(
        "Starting crawl of {} domain(s) with {} pattern(s)",
        domains.len(),
        classifier.pattern_count()
    );

    let mut tasks = JoinSet::new();
    for domain in domains {
        let domain = domain.clone();
        let config = Arc::clone(&config);
        let factory = Arc::clone(&factory);
        let classifier = Arc::clone(&classifier);
        let global_gate = Arc::clone(&global_gate);

        tasks.spawn(async move {
            let crawl = crawl_domain(&config, factory, classifier, global_gate, &domain);
            let result = match config.domain_deadline {
                Some(deadline) => match tokio::time::timeout(deadline, crawl).await {
                    Ok(result) => result,
                    Err(_) => Err(CrawlError::DeadlineExceeded {
                        domain: domain.clone(),
                    }),
                },
                None => crawl.await,
            };
            (domain, result)
        });
    }

    let mut aggregate = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((domain, Ok(products))) => {
                let mut urls: Vec<String> = products.into_iter().collect();
                urls.sort();
                tracing::info!("{}: {} product URL(s)", domain, urls.len());
                aggregate.insert(domain, urls);
            }
            Ok((domain, Err(e))) => {
                tracing::warn!("Crawl failed for {}: {}", domain, e);
                aggregate.insert(domain, Vec::new());
            }
            Err(e) => {
                tracing::error!("Domain task panicked: {}", e);
            }
        }
    }

    // A panicked task loses its domain name on the way out; make sure
    // every requested domain still appears in the result
    for domain in domains {
        aggregate.entry(domain.clone()).or_default();
    }

    Ok(aggregate)
}

/// Drives one domain's frontier to exhaustion
async fn crawl_domain(
    config: &Config,
    factory: Arc<dyn FetcherFactory>,
    classifier: Arc<ProductClassifier>,
    global_gate: Arc<Semaphore>,
    domain: &str,
) -> crate::Result<HashSet<String>> {
    let root = normalize_root(domain)?;
    let fetcher = factory.open(domain).await?;
    let gates = AdmissionGates::new(global_gate, config.concurrent_requests_per_domain);
    let frontier = DomainFrontier::new(root.clone());

    let mut round = 0u32;
    loop {
        let batch = frontier.next_batch();
        if batch.is_empty() {
            break;
        }
        round += 1;
        tracing::debug!("{}: round {}, {} URL(s)", domain, round, batch.len());

        let fetches = batch.into_iter().map(|url| {
            let gates = gates.clone();
            let fetcher = Arc::clone(&fetcher);
            async move {
                let _permit = gates.admit().await;
                let result = fetcher.fetch(&url).await;
                (url, result)
            }
        });

        for (url, result) in join_all(fetches).await {
            match result {
                Ok(page) => {
                    let (products, discovered) = sift_hrefs(&root, &classifier, &page.hrefs);
                    frontier.merge(products, discovered);
                }
                // The URL stays visited; it contributes no links and is
                // never retried beyond its own fetch budget
                Err(e) => {
                    tracing::warn!("Fetch failed for {}: {}", url, e);
                }
            }
        }
    }

    tracing::info!(
        "{}: done after {} round(s), {} page(s) visited",
        domain,
        round,
        frontier.visited_count()
    );
    Ok(frontier.into_products())
}

/// Normalizes and filters one page's raw hrefs
///
/// Returns the classified product URLs and the full set of same-site
/// crawlable URLs to feed back into the frontier.
fn sift_hrefs(
    root: &Url,
    classifier: &ProductClassifier,
    hrefs: &[String],
) -> (Vec<String>, Vec<String>) {
    let mut products = Vec::new();
    let mut discovered = Vec::new();

    for href in hrefs {
        let Some(normalized) = normalize_href(root, href) else {
            continue;
        };
        if !is_crawlable(&normalized) {
            continue;
        }

        let url = normalized.as_str().to_string();
        if classifier.is_product(&normalized) {
            products.push(url.clone());
        }
        discovered.push(url);
    }

    (products, discovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, FetchErrorKind, FetchedPage, PageFetcher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory site: normalized URL -> outbound hrefs
    ///
    /// The in-flight counters are shareable so several sites can report
    /// into one probe when a test checks the global bound.
    struct FakeSite {
        pages: HashMap<String, Vec<String>>,
        hits: Mutex<Vec<String>>,
        in_flight: Arc<AtomicUsize>,
        peak_in_flight: Arc<AtomicUsize>,
        per_fetch_delay: Duration,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &[&str])]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, hrefs)| {
                        (
                            url.to_string(),
                            hrefs.iter().map(|h| h.to_string()).collect(),
                        )
                    })
                    .collect(),
                hits: Mutex::new(Vec::new()),
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak_in_flight: Arc::new(AtomicUsize::new(0)),
                per_fetch_delay: Duration::ZERO,
            })
        }

        fn with_delay(pages: &[(&str, &[&str])], delay: Duration) -> Arc<Self> {
            let mut site = Self::new(pages);
            Arc::get_mut(&mut site).unwrap().per_fetch_delay = delay;
            site
        }

        fn hits(&self) -> Vec<String> {
            self.hits.lock().unwrap().clone()
        }

        fn hit_count(&self, url: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|h| *h == url).count()
        }
    }

    struct FakeFetcher {
        site: Arc<FakeSite>,
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.site.hits.lock().unwrap().push(url.to_string());

            let now = self.site.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.site.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.site.per_fetch_delay.is_zero() {
                tokio::time::sleep(self.site.per_fetch_delay).await;
            }
            self.site.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.site.pages.get(url) {
                Some(hrefs) => Ok(FetchedPage {
                    content: String::new(),
                    hrefs: hrefs.clone(),
                }),
                None => Err(FetchError {
                    kind: FetchErrorKind::Status(404),
                    attempts: 1,
                }),
            }
        }
    }

    /// Factory serving fake sites, with optional per-domain init failure
    struct FakeFactory {
        sites: HashMap<String, Arc<FakeSite>>,
        failing: HashSet<String>,
    }

    impl FakeFactory {
        fn new(sites: Vec<(&str, Arc<FakeSite>)>) -> Arc<Self> {
            Arc::new(Self {
                sites: sites
                    .into_iter()
                    .map(|(d, s)| (d.to_string(), s))
                    .collect(),
                failing: HashSet::new(),
            })
        }

        fn with_failing(mut self: Arc<Self>, domain: &str) -> Arc<Self> {
            Arc::get_mut(&mut self)
                .unwrap()
                .failing
                .insert(domain.to_string());
            self
        }
    }

    #[async_trait]
    impl FetcherFactory for FakeFactory {
        async fn open(&self, domain: &str) -> crate::Result<Arc<dyn PageFetcher>> {
            if self.failing.contains(domain) {
                return Err(CrawlError::BackendInit(format!(
                    "browser launch failed for {}",
                    domain
                )));
            }
            let site = self
                .sites
                .get(domain)
                .cloned()
                .ok_or_else(|| CrawlError::BackendInit(format!("no fake site for {}", domain)))?;
            Ok(Arc::new(FakeFetcher { site }))
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            download_delay: Duration::ZERO,
            ..Config::default()
        })
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|d| d.to_string()).collect()
    }

    #[tokio::test]
    async fn test_single_domain_product_discovery() {
        // Homepage links to a product, a plain page, and a foreign site
        let site = FakeSite::new(&[(
            "https://shop.example/",
            &["/product/123", "/about", "https://other.com/x"],
        )]);
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::new(vec!["/product/".to_string()]),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        assert_eq!(
            result["https://shop.example"],
            vec!["https://shop.example/product/123"]
        );
        // The foreign link was never fetched
        assert!(!site.hits().iter().any(|h| h.contains("other.com")));
    }

    #[tokio::test]
    async fn test_self_link_and_query_dedup() {
        // Page links to itself and to a product with a tracking query;
        // repeated discovery across rounds must not refetch anything
        let site = FakeSite::new(&[
            ("https://shop.example/", &["/", "/product/1?ref=abc"][..]),
            ("https://shop.example/product/1", &["/", "/product/1?ref=abc"][..]),
        ]);
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        assert_eq!(
            result["https://shop.example"],
            vec!["https://shop.example/product/1"]
        );
        assert_eq!(site.hit_count("https://shop.example/"), 1);
        assert_eq!(site.hit_count("https://shop.example/product/1"), 1);
    }

    #[tokio::test]
    async fn test_non_document_resources_never_fetched() {
        let site = FakeSite::new(&[(
            "https://shop.example/",
            &["/catalog.jpg", "/styles.css", "/product/5"],
        )]);
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        let hits = site.hits();
        assert!(!hits.iter().any(|h| h.ends_with(".jpg")));
        assert!(!hits.iter().any(|h| h.ends_with(".css")));
        assert!(hits.contains(&"https://shop.example/product/5".to_string()));
    }

    #[tokio::test]
    async fn test_multi_round_discovery() {
        // Products only reachable through intermediate pages
        let site = FakeSite::new(&[
            ("https://shop.example/", &["/catalog"][..]),
            ("https://shop.example/catalog", &["/catalog/shoes"][..]),
            ("https://shop.example/catalog/shoes", &["/product/77"][..]),
        ]);
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        assert_eq!(
            result["https://shop.example"],
            vec!["https://shop.example/product/77"]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_abort_round() {
        // /broken 404s; the rest of the round proceeds
        let site = FakeSite::new(&[
            ("https://shop.example/", &["/broken", "/product/9"][..]),
            ("https://shop.example/product/9", &[][..]),
        ]);
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        assert_eq!(
            result["https://shop.example"],
            vec!["https://shop.example/product/9"]
        );
        // The broken URL was attempted exactly once
        assert_eq!(site.hit_count("https://shop.example/broken"), 1);
    }

    #[tokio::test]
    async fn test_failing_domain_is_isolated() {
        let site_a = FakeSite::new(&[("https://a.example/", &["/product/1"][..])]);
        let site_c = FakeSite::new(&[("https://c.example/", &["/product/2"][..])]);

        let factory = FakeFactory::new(vec![
            ("https://a.example", Arc::clone(&site_a)),
            ("https://c.example", Arc::clone(&site_c)),
        ])
        .with_failing("https://b.example");

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://a.example", "https://b.example", "https://c.example"]),
        )
        .await
        .unwrap();

        assert_eq!(result["https://a.example"], vec!["https://a.example/product/1"]);
        assert_eq!(result["https://b.example"], Vec::<String>::new());
        assert_eq!(result["https://c.example"], vec!["https://c.example/product/2"]);
    }

    #[tokio::test]
    async fn test_unparseable_root_is_isolated() {
        let site = FakeSite::new(&[("https://a.example/", &[][..])]);
        let factory = FakeFactory::new(vec![("https://a.example", site)]);

        let result = crawl_domains(
            test_config(),
            factory,
            &PatternSet::default(),
            &domains(&["https://a.example", "ftp://bad.example"]),
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result["ftp://bad.example"], Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_per_domain_concurrency_bound() {
        // One page fanning out to many; per-domain gate must cap the burst
        let links: Vec<String> = (0..20).map(|i| format!("/page/{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let site = FakeSite::with_delay(
            &[("https://shop.example/", &link_refs[..])],
            Duration::from_millis(20),
        );
        let factory = FakeFactory::new(vec![("https://shop.example", Arc::clone(&site))]);

        let config = Arc::new(Config {
            download_delay: Duration::ZERO,
            concurrent_requests: 100,
            concurrent_requests_per_domain: 3,
            ..Config::default()
        });

        crawl_domains(
            config,
            factory,
            &PatternSet::default(),
            &domains(&["https://shop.example"]),
        )
        .await
        .unwrap();

        let peak = site.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "per-domain peak {} exceeded capacity 3", peak);
    }

    #[tokio::test]
    async fn test_global_concurrency_bound() {
        let links: Vec<String> = (0..10).map(|i| format!("/page/{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

        // Both domains report into one probe so the peak counts the
        // combined in-flight total
        let shared_current = Arc::new(AtomicUsize::new(0));
        let shared_peak = Arc::new(AtomicUsize::new(0));
        let mut site_a = FakeSite::with_delay(
            &[("https://a.example/", &link_refs[..])],
            Duration::from_millis(20),
        );
        let mut site_b = FakeSite::with_delay(
            &[("https://b.example/", &link_refs[..])],
            Duration::from_millis(20),
        );
        for site in [&mut site_a, &mut site_b] {
            let site = Arc::get_mut(site).unwrap();
            site.in_flight = Arc::clone(&shared_current);
            site.peak_in_flight = Arc::clone(&shared_peak);
        }

        let factory = FakeFactory::new(vec![
            ("https://a.example", Arc::clone(&site_a)),
            ("https://b.example", Arc::clone(&site_b)),
        ]);

        let config = Arc::new(Config {
            download_delay: Duration::ZERO,
            concurrent_requests: 4,
            concurrent_requests_per_domain: 10,
            ..Config::default()
        });

        crawl_domains(
            config,
            factory,
            &PatternSet::default(),
            &domains(&["https://a.example", "https://b.example"]),
        )
        .await
        .unwrap();

        let peak = shared_peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "combined peak {} exceeded global capacity 4", peak);
    }

    #[tokio::test]
    async fn test_empty_domain_list_rejected() {
        let factory = FakeFactory::new(vec![]);
        let result =
            crawl_domains(test_config(), factory, &PatternSet::default(), &[]).await;
        assert!(matches!(result.unwrap_err(), CrawlError::EmptyDomainList));
    }

    #[tokio::test]
    async fn test_domain_deadline_fails_only_that_domain() {
        // Slow domain: every fetch takes longer than the deadline allows
        let links: Vec<String> = (0..5).map(|i| format!("/page/{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let slow = FakeSite::with_delay(
            &[("https://slow.example/", &link_refs[..])],
            Duration::from_millis(200),
        );
        let fast = FakeSite::new(&[("https://fast.example/", &["/product/1"][..])]);

        let factory = FakeFactory::new(vec![
            ("https://slow.example", slow),
            ("https://fast.example", fast),
        ]);

        let config = Arc::new(Config {
            download_delay: Duration::ZERO,
            domain_deadline: Some(Duration::from_millis(100)),
            ..Config::default()
        });

        let result = crawl_domains(
            config,
            factory,
            &PatternSet::default(),
            &domains(&["https://slow.example", "https://fast.example"]),
        )
        .await
        .unwrap();

        assert_eq!(result["https://slow.example"], Vec::<String>::new());
        assert_eq!(
            result["https://fast.example"],
            vec!["https://fast.example/product/1"]
        );
    }

    #[test]
    fn test_sift_hrefs_separates_products() {
        let root = Url::parse("https://shop.example/").unwrap();
        let classifier = ProductClassifier::default();
        let hrefs = vec![
            "/product/1".to_string(),
            "/about".to_string(),
            "https://other.com/product/2".to_string(),
            "/banner.png".to_string(),
        ];

        let (products, discovered) = sift_hrefs(&root, &classifier, &hrefs);

        assert_eq!(products, vec!["https://shop.example/product/1"]);
        assert_eq!(
            discovered,
            vec![
                "https://shop.example/product/1",
                "https://shop.example/about"
            ]
        );
    }
}
