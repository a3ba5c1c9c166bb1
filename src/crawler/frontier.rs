//! Per-domain crawl state
//!
//! One frontier exists per domain, owned by that domain's crawl task. The
//! three sets live behind a single mutex: the pending→visited move and the
//! post-fetch merge are each one critical section, which is the whole
//! deduplication guarantee — a URL can never be handed out twice.

use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

#[derive(Debug, Default)]
struct FrontierState {
    /// Normalized URLs discovered but not yet fetched
    pending: HashSet<String>,
    /// Normalized URLs already handed out for fetching
    visited: HashSet<String>,
    /// Normalized URLs classified as product pages
    products: HashSet<String>,
}

/// Frontier and result state for one domain's crawl
#[derive(Debug)]
pub struct DomainFrontier {
    root: Url,
    state: Mutex<FrontierState>,
}

impl DomainFrontier {
    /// Creates a frontier seeded with the domain root
    pub fn new(root: Url) -> Self {
        let mut pending = HashSet::new();
        pending.insert(root.as_str().to_string());

        Self {
            root,
            state: Mutex::new(FrontierState {
                pending,
                ..FrontierState::default()
            }),
        }
    }

    /// The canonical domain root, fixed at creation
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Takes the next round's batch
    ///
    /// Every returned URL is moved from `pending` to `visited` in the same
    /// critical section, before any fetch begins. An empty batch means the
    /// domain is done.
    pub fn next_batch(&self) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        let batch: Vec<String> = state.pending.drain().collect();
        for url in &batch {
            state.visited.insert(url.clone());
        }
        batch
    }

    /// Merges one fetched page's findings
    ///
    /// Classified URLs join `products`; discovered URLs join `pending`
    /// unless they were already seen. One critical section per page.
    pub fn merge<P, D>(&self, products: P, discovered: D)
    where
        P: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        let mut state = self.state.lock().unwrap();

        for url in products {
            state.products.insert(url);
        }

        for url in discovered {
            if !state.visited.contains(&url) {
                state.pending.insert(url);
            }
        }
    }

    /// Number of URLs fetched so far
    pub fn visited_count(&self) -> usize {
        self.state.lock().unwrap().visited.len()
    }

    /// Number of product URLs found so far
    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    /// Consumes the frontier, yielding the final product set
    pub fn into_products(self) -> HashSet<String> {
        self.state.into_inner().unwrap().products
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let state = self.state.lock().unwrap();
        assert!(
            state.pending.is_disjoint(&state.visited),
            "pending and visited overlap"
        );
    }
}
