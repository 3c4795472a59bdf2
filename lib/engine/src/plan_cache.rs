use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A cached join plan: the pattern permutation chosen by the planner,
/// valid for one statistics version of the store.
#[derive(Debug)]
pub(crate) struct CachedPlan {
    pub(crate) permutation: Vec<usize>,
    pub(crate) stats_tx_id: u64,
    last_access: AtomicU64,
}

/// A bounded LRU of join plans keyed on the query-source hash.
///
/// Reads clone the current map snapshot `Arc` and bump a per-entry access
/// stamp; only insertions copy the map, under the single writer mutex.
/// Entries whose statistics version no longer matches the store are
/// treated as absent.
#[derive(Debug)]
pub(crate) struct PlanCache {
    capacity: usize,
    entries: Mutex<Arc<FxHashMap<u64, Arc<CachedPlan>>>>,
    clock: AtomicU64,
}

impl PlanCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Arc::new(FxHashMap::default())),
            clock: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> Arc<FxHashMap<u64, Arc<CachedPlan>>> {
        Arc::clone(&self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Looks up a plan, refusing entries cached under a different
    /// statistics version.
    pub(crate) fn get(&self, key: u64, stats_tx_id: u64) -> Option<Vec<usize>> {
        let entries = self.snapshot();
        let plan = entries.get(&key)?;
        if plan.stats_tx_id != stats_tx_id {
            return None;
        }
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        plan.last_access.store(stamp, Ordering::Relaxed);
        Some(plan.permutation.clone())
    }

    /// Inserts a plan, evicting the least recently used entry when the
    /// cache is full. The map is copied on write so concurrent readers
    /// keep their snapshot.
    pub(crate) fn insert(&self, key: u64, permutation: Vec<usize>, stats_tx_id: u64) {
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next: FxHashMap<u64, Arc<CachedPlan>> = (**guard).clone();
        next.insert(
            key,
            Arc::new(CachedPlan {
                permutation,
                stats_tx_id,
                last_access: AtomicU64::new(stamp),
            }),
        );
        while next.len() > self.capacity {
            let oldest = next
                .iter()
                .min_by_key(|(_, plan)| plan.last_access.load(Ordering::Relaxed))
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    next.remove(&key);
                }
                None => break,
            }
        }
        *guard = Arc::new(next);
    }
}
