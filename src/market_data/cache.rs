use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::market_data::PriceSeries;
use crate::types::Period;

/// Composite key that identifies one fetched series.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub ticker: String,
    pub period: Period,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, period: Period) -> Self {
        Self {
            ticker: ticker.into(),
            period,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.ticker, self.period)
    }
}

struct Entry {
    series: Arc<PriceSeries>,
    last_used: u64,
}

/// Serialisable counters for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

// ---------------------------------------------------------------------------
// PriceCache -- bounded LRU map shared by every request
// ---------------------------------------------------------------------------

/// Thread-safe `(ticker, period) → PriceSeries` map with least-recently-used
/// eviction. A capacity of zero disables eviction entirely.
///
/// Entries never expire on their own; stale data is accepted until the entry
/// is evicted, invalidated, or the process restarts.
pub struct PriceCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PriceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a series and mark it as most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<PriceSeries>> {
        let now = self.tick();
        let mut map = self.entries.lock();
        match map.get_mut(key) {
            Some(entry) => {
                entry.last_used = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "price cache hit");
                Some(entry.series.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "price cache miss");
                None
            }
        }
    }

    /// Store a series, evicting the least recently used entry when full.
    pub fn insert(&self, key: CacheKey, series: Arc<PriceSeries>) {
        let now = self.tick();
        let mut map = self.entries.lock();

        if self.capacity > 0 && !map.contains_key(&key) {
            while map.len() >= self.capacity {
                let oldest = map
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        map.remove(&k);
                        debug!(evicted = %k, "price cache full, evicted least recently used");
                    }
                    None => break,
                }
            }
        }

        map.insert(
            key,
            Entry {
                series,
                last_used: now,
            },
        );
    }

    /// Drop one entry. Returns `true` if it was present.
    #[cfg(test)]
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    #[cfg(test)]
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for PriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCache")
            .field("stats", &self.stats())
            .finish()
    }
}
