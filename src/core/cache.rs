//! Time-bounded cache for aligned price matrices, keyed by period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::align::AlignedMatrix;
use crate::core::period::Period;

struct StoredEntry {
    matrix: Arc<AlignedMatrix>,
    built_at: Instant,
}

struct Slot {
    cell: Arc<Mutex<Option<StoredEntry>>>,
    last_used: u64,
}

struct CacheState {
    slots: HashMap<Period, Slot>,
    clock: u64,
}

/// Bounded `Period -> AlignedMatrix` cache with a fixed TTL.
///
/// Each period key owns its own async mutex, so concurrent misses for one
/// key converge on a single rebuild (later callers wait and reuse the result)
/// while different keys proceed independently. An expired entry is recomputed
/// on the next read, never served. Least-recently-used keys are evicted once
/// the capacity bound would be exceeded.
pub struct RefreshCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl RefreshCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Returns the live matrix for `period`, or runs `build` to produce and
    /// store one. A failed build leaves the cache unchanged.
    pub async fn get_or_build<F, Fut, E>(
        &self,
        period: Period,
        build: F,
    ) -> Result<Arc<AlignedMatrix>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AlignedMatrix, E>>,
    {
        let cell = {
            let mut state = self.state.lock().await;
            state.clock += 1;
            let now = state.clock;

            if !state.slots.contains_key(&period) && state.slots.len() >= self.capacity {
                let lru = state
                    .slots
                    .iter()
                    .min_by_key(|(_, slot)| slot.last_used)
                    .map(|(key, _)| *key);
                if let Some(key) = lru {
                    state.slots.remove(&key);
                    debug!(period = %key, "Cache EVICT");
                }
            }

            let slot = state.slots.entry(period).or_insert_with(|| Slot {
                cell: Arc::new(Mutex::new(None)),
                last_used: now,
            });
            slot.last_used = now;
            Arc::clone(&slot.cell)
        };

        // Per-key lock: holds for the duration of a rebuild, so concurrent
        // misses for this period wait here instead of refetching.
        let mut entry = cell.lock().await;

        if let Some(stored) = entry.as_ref() {
            if stored.built_at.elapsed() < self.ttl {
                debug!(period = %period, "Cache HIT");
                return Ok(Arc::clone(&stored.matrix));
            }
            debug!(period = %period, "Cache entry expired");
        }

        debug!(period = %period, "Cache MISS");
        let matrix = Arc::new(build().await?);
        *entry = Some(StoredEntry {
            matrix: Arc::clone(&matrix),
            built_at: Instant::now(),
        });
        Ok(matrix)
    }
}
