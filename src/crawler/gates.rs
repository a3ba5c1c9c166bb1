//! Two-level admission control for in-flight fetches
//!
//! A fetch may run only while holding a permit from the global gate (shared
//! by every domain) and one from its domain's gate. Permits are owned by
//! the in-flight future and returned when it finishes, on every exit path.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gates for one domain's fetches
///
/// The global semaphore is shared across all domains in a run; the domain
/// semaphore is private to one domain task. Both are plain counting
/// semaphores; no other cross-domain shared state exists.
#[derive(Clone)]
pub struct AdmissionGates {
    global: Arc<Semaphore>,
    domain: Arc<Semaphore>,
}

/// Both permits for one in-flight fetch; dropping releases them
pub struct FetchPermit {
    _domain: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl AdmissionGates {
    pub fn new(global: Arc<Semaphore>, per_domain: usize) -> Self {
        Self {
            global,
            domain: Arc::new(Semaphore::new(per_domain)),
        }
    }

    /// Waits for both gates to admit a fetch
    ///
    /// The domain permit is taken first so a saturated domain waits in
    /// its own lane without occupying a global slot.
    pub async fn admit(&self) -> FetchPermit {
        // acquire_owned only fails if the semaphore is closed, which
        // never happens here; treat it as an unbounded gate in that case
        let domain = match self.domain.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("domain gate is never closed"),
        };
        let global = match self.global.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("global gate is never closed"),
        };

        FetchPermit {
            _domain: domain,
            _global: global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks the maximum concurrently-held permit count
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ConcurrencyProbe {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_per_domain_capacity_enforced() {
        let global = Arc::new(Semaphore::new(100));
        let gates = AdmissionGates::new(global, 2);
        let probe = Arc::new(ConcurrencyProbe::new());

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let gates = gates.clone();
                let probe = Arc::clone(&probe);
                tokio::spawn(async move {
                    let _permit = gates.admit().await;
                    probe.enter();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    probe.exit();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert!(probe.peak() <= 2, "peak concurrency {} > 2", probe.peak());
    }

    #[tokio::test]
    async fn test_global_capacity_enforced_across_domains() {
        let global = Arc::new(Semaphore::new(3));
        let gate_a = AdmissionGates::new(Arc::clone(&global), 10);
        let gate_b = AdmissionGates::new(Arc::clone(&global), 10);
        let probe = Arc::new(ConcurrencyProbe::new());

        let mut tasks = Vec::new();
        for i in 0..12 {
            let gates = if i % 2 == 0 {
                gate_a.clone()
            } else {
                gate_b.clone()
            };
            let probe = Arc::clone(&probe);
            tasks.push(tokio::spawn(async move {
                let _permit = gates.admit().await;
                probe.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                probe.exit();
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert!(probe.peak() <= 3, "peak concurrency {} > 3", probe.peak());
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let global = Arc::new(Semaphore::new(1));
        let gates = AdmissionGates::new(global, 1);

        {
            let _permit = gates.admit().await;
        }
        // A second admit must not hang once the first permit is dropped
        let _again = tokio::time::timeout(Duration::from_secs(1), gates.admit())
            .await
            .expect("permit was not released");
    }
}
