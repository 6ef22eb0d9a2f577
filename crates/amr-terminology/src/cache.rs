use std::collections::HashMap;
use std::sync::Mutex;

use crate::normalize::Resolution;

/// Cache key: the raw (system, code, display) triple.
pub type CacheKey = (Option<String>, Option<String>, Option<String>);

struct CacheInner {
    /// Catalog version the cached entries belong to. A different version on
    /// access empties the cache: entries have catalog-scoped lifetime.
    version: String,
    entries: HashMap<CacheKey, (u64, Resolution)>,
    clock: u64,
}

/// Bounded cache for oracle responses, least-recently-used eviction,
/// last-writer-wins per key.
pub struct NormalizationCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl NormalizationCache {
    pub const DEFAULT_CAPACITY: usize = 2048;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                version: String::new(),
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn get(&self, catalog_version: &str, key: &CacheKey) -> Option<Resolution> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.version != catalog_version {
            return None;
        }
        inner.clock += 1;
        let clock = inner.clock;
        inner.entries.get_mut(key).map(|entry| {
            entry.0 = clock;
            entry.1.clone()
        })
    }

    pub fn insert(&self, catalog_version: &str, key: CacheKey, value: Resolution) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.version != catalog_version {
            inner.entries.clear();
            inner.version = catalog_version.to_string();
        }
        inner.clock += 1;
        let clock = inner.clock;
        inner.entries.insert(key, (clock, value));

        if inner.entries.len() > self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, (stamp, _))| *stamp)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
