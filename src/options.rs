use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::lru::LruCache;
use crate::storage::{Store, StoreError};

/// How long a cached option read stays valid. Short on purpose: the cache
/// only exists to collapse the burst of reads the extraction cascade makes
/// per captured page.
const OPTION_CACHE_TTL: Duration = Duration::from_secs(30);

const OPTION_CACHE_CAPACITY: usize = 128;

pub const OPT_AUTO_TAGS: &str = "autoTags";
pub const OPT_EXTENDED_KEYWORDS: &str = "extendedKeywords";
pub const OPT_REDUCE_KEYWORDS: &str = "reduceKeywords";
pub const OPT_CACHE_BOOKMARK_CHECKS: &str = "cacheBookmarkChecks";
pub const OPT_BOOKMARK_CHECK_TTL_MINUTES: &str = "bookmarkCheckTtlMinutes";
pub const OPT_HEADLINE_MAX_DEPTH: &str = "headlineMaxDepth";
pub const OPT_NOTIFY_SUCCESS: &str = "notifySuccess";
pub const OPT_CLOSE_TAB: &str = "closeTab";
pub const OPT_REQUEST_TIMEOUT_SECS: &str = "requestTimeoutSecs";

/// Default for an absent option. Boolean toggles read as `false` unless
/// seeded; the numeric options carry their install-time defaults.
pub fn default_for(name: &str) -> Value {
    match name {
        OPT_BOOKMARK_CHECK_TTL_MINUTES => Value::from(30u64),
        OPT_HEADLINE_MAX_DEPTH => Value::from(3u64),
        OPT_REQUEST_TIMEOUT_SECS => Value::from(10u64),
        _ => Value::Bool(false),
    }
}

/// Read-through options layer over the `options` store partition.
///
/// Two concurrent reads of the same uncached option may both hit the store;
/// reads are idempotent so no lock is held across the store round-trip.
pub struct Options {
    store: Store,
    cache: Mutex<LruCache<String, (Value, Instant)>>,
}

impl Options {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            cache: Mutex::new(LruCache::new(OPTION_CACHE_CAPACITY)),
        }
    }

    /// Read one option, falling back to its default when absent.
    pub fn get(&self, name: &str) -> Result<Value, StoreError> {
        if let Some(value) = self.cached(name) {
            return Ok(value);
        }

        let value = self
            .store
            .load_one("options", name)?
            .unwrap_or_else(|| default_for(name));
        self.remember(name, &value);
        Ok(value)
    }

    /// Batch read. Requested names are split into cache hits and misses;
    /// the misses go to the store in a single read.
    pub fn get_many(&self, names: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let mut result = HashMap::with_capacity(names.len());
        let mut misses = Vec::new();

        for name in names {
            match self.cached(name) {
                Some(value) => {
                    result.insert(name.to_string(), value);
                }
                None => misses.push(*name),
            }
        }

        if !misses.is_empty() {
            let loaded = self.store.load("options", &misses)?;
            for name in misses {
                let value = loaded
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| default_for(name));
                self.remember(name, &value);
                result.insert(name.to_string(), value);
            }
        }

        Ok(result)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.get(name)?.as_bool().unwrap_or(false))
    }

    pub fn get_u64(&self, name: &str) -> Result<u64, StoreError> {
        Ok(self
            .get(name)?
            .as_u64()
            .unwrap_or_else(|| default_for(name).as_u64().unwrap_or(0)))
    }

    /// Write options. The read cache is dropped before the write lands so
    /// a read issued after `set` returns never observes the old value.
    pub fn set(&self, records: &[(&str, Value)]) -> Result<(), StoreError> {
        self.invalidate();
        self.store.store("options", records)
    }

    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cached(&self, name: &str) -> Option<Value> {
        let mut cache = self.cache.lock().ok()?;
        let key = name.to_string();
        let expired = match cache.get(&key) {
            Some((_, stored_at)) => stored_at.elapsed() > OPTION_CACHE_TTL,
            None => return None,
        };
        if expired {
            cache.remove(&key);
            return None;
        }
        cache.get(&key).map(|(value, _)| value.clone())
    }

    fn remember(&self, name: &str, value: &Value) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(name.to_string(), (value.clone(), Instant::now()));
        }
    }
}
