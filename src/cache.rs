//! Tag/folder cache and the per-URL bookmark-check cache.
//!
//! Two very different failure policies live here. The tag/folder side is
//! load-bearing for keyword reduction: a failed live fetch propagates and
//! nothing is served from a stale entry. The bookmark-check side is an
//! optimization only: every storage fault is caught, logged and treated
//! as a miss.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::api::{ApiOutcome, Method, NotificationSink, RemoteApi};
use crate::options::{Options, OPT_BOOKMARK_CHECK_TTL_MINUTES, OPT_CACHE_BOOKMARK_CHECKS};
use crate::storage::{StorageBackend, Store, StoreError};
use crate::urlnorm::{NormalizeOptions, UrlNormalizer};

/// Partitions of the cache-only store.
pub const CACHE_PARTITIONS: &[&str] = &["keywords", "folders", "bookmark_checks"];

/// Server-fetched tag/folder lists go stale after a day.
const TAG_CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Pooled store handle closes after this much inactivity.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Keywords,
    Folders,
}

impl CacheKind {
    pub fn namespace(&self) -> &'static str {
        match self {
            CacheKind::Keywords => "keywords",
            CacheKind::Folders => "folders",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            CacheKind::Keywords => "tags",
            CacheKind::Folders => "folders",
        }
    }
}

struct PooledConn {
    store: Store,
    last_used: Instant,
}

/// Reuses one opened cache store across calls instead of reopening per
/// call. The mutex also serializes concurrent opens, so only a single
/// open is ever in flight.
pub struct CacheStorePool {
    backend: Arc<dyn StorageBackend>,
    conn: Mutex<Option<PooledConn>>,
}

impl CacheStorePool {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            conn: Mutex::new(None),
        }
    }

    fn get(&self) -> Result<Store, StoreError> {
        let mut guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(conn) = guard.as_mut() {
            let idle_expired = conn.last_used.elapsed() > POOL_IDLE_TIMEOUT;
            // staleness check: the handle is only trusted while its
            // partitions still exist underneath it
            let stale = !conn.store.has_partition("bookmark_checks");
            if !idle_expired && !stale {
                conn.last_used = Instant::now();
                return Ok(conn.store.clone());
            }
            log::debug!(
                "cache store handle dropped (idle_expired={idle_expired}, stale={stale})"
            );
            *guard = None;
        }

        let store = Store::open_with_partitions(self.backend.clone(), CACHE_PARTITIONS)?;
        *guard = Some(PooledConn {
            store: store.clone(),
            last_used: Instant::now(),
        });
        Ok(store)
    }
}

pub struct TagCache {
    pool: CacheStorePool,
    api: Arc<dyn RemoteApi>,
    notifier: Option<Arc<dyn NotificationSink>>,
    options: Arc<Options>,
    normalizer: UrlNormalizer,
}

impl TagCache {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        api: Arc<dyn RemoteApi>,
        notifier: Option<Arc<dyn NotificationSink>>,
        options: Arc<Options>,
    ) -> Self {
        Self {
            pool: CacheStorePool::new(backend),
            api,
            notifier,
            options,
            normalizer: UrlNormalizer::new(),
        }
    }

    /// Return the cached list, refetching from the server when the entry
    /// is absent, empty, expired, or a refresh is forced. A failed live
    /// fetch propagates; there is no stale-value fallback.
    pub fn cache_get(&self, kind: CacheKind, force_server: bool) -> anyhow::Result<Vec<String>> {
        let store = self.pool.get()?;
        let ns = kind.namespace();

        if !force_server {
            let value = store.load_one(ns, "value")?;
            let created = store
                .load_one(ns, &format!("{ns}_created"))?
                .and_then(|v| v.as_i64());

            if let (Some(value), Some(created)) = (value, created) {
                let items = parse_name_list(&value);
                let age = now_ms() - created;
                if !items.is_empty() && age <= TAG_CACHE_TTL_MS {
                    return Ok(items);
                }
            }
        }

        log::debug!("refreshing {ns} from server");
        let outcome = self
            .api
            .call(kind.endpoint(), Method::Get, &json!({ "limit": 1000 }))?;
        let items = match outcome {
            ApiOutcome::Success(body) => parse_name_list(&body),
            ApiOutcome::HttpError {
                status,
                status_text,
            } => anyhow::bail!("{ns} fetch failed: {status} {status_text}"),
        };

        self.cache_add(kind, &items)?;
        if let Some(notifier) = &self.notifier {
            notifier.cache_refreshed(ns);
        }
        Ok(items)
    }

    /// Unconditionally overwrite the cached list and its timestamp.
    pub fn cache_add(&self, kind: CacheKind, items: &[String]) -> Result<(), StoreError> {
        let store = self.pool.get()?;
        let ns = kind.namespace();
        let created_key = format!("{ns}_created");
        store.store(
            ns,
            &[
                ("value", json!(items)),
                (created_key.as_str(), json!(now_ms())),
            ],
        )
    }

    /// Merge client-side additions into the cached list so a brand-new
    /// tag is visible to the UI before the next server sync. The entry's
    /// timestamp is left alone; expiry still tracks the last server sync.
    pub fn cache_temp_add(&self, kind: CacheKind, new_items: &[String]) -> Result<(), StoreError> {
        let store = self.pool.get()?;
        let ns = kind.namespace();

        let mut items = store
            .load_one(ns, "value")?
            .map(|v| parse_name_list(&v))
            .unwrap_or_default();
        items.extend(new_items.iter().cloned());
        items.sort();
        items.dedup();

        store.store(ns, &[("value", json!(items))])
    }

    // --- bookmark-check cache ------------------------------------------

    /// Cache the server's "already bookmarked?" answer for a URL. No-op
    /// when the feature is disabled; storage faults are logged and
    /// swallowed.
    pub fn cache_bookmark_check(&self, url: &str, result: &Value) {
        if !self.bookmark_checks_enabled() {
            return;
        }
        let key = self.bookmark_key(url);
        let record = json!({ "value": result, "timestamp": now_ms() });
        if let Err(e) = self
            .pool
            .get()
            .and_then(|store| store.store("bookmark_checks", &[(key.as_str(), record)]))
        {
            log::warn!("bookmark check cache write failed: {e}");
        }
    }

    /// Cached check result, or `None` on miss, expiry, disablement, or
    /// any storage fault. Expired entries are deleted on read.
    pub fn get_cached_bookmark_check(&self, url: &str) -> Option<Value> {
        if !self.bookmark_checks_enabled() {
            return None;
        }
        let key = self.bookmark_key(url);
        let record = match self
            .pool
            .get()
            .and_then(|store| store.load_one("bookmark_checks", &key))
        {
            Ok(record) => record?,
            Err(e) => {
                log::warn!("bookmark check cache read failed: {e}");
                return None;
            }
        };

        let timestamp = record.get("timestamp").and_then(Value::as_i64)?;
        let ttl_ms = self.bookmark_check_ttl_ms();
        if now_ms() - timestamp > ttl_ms {
            log::debug!("bookmark check entry for {url} expired");
            self.invalidate_bookmark_cache(url);
            return None;
        }

        record.get("value").cloned()
    }

    pub fn invalidate_bookmark_cache(&self, url: &str) {
        let key = self.bookmark_key(url);
        if let Err(e) = self
            .pool
            .get()
            .and_then(|store| store.delete("bookmark_checks", &[key.as_str()]))
        {
            log::warn!("bookmark check cache invalidation failed: {e}");
        }
    }

    pub fn clear_bookmark_check_cache(&self) {
        if let Err(e) = self.pool.get().and_then(|store| store.clear("bookmark_checks")) {
            log::warn!("bookmark check cache clear failed: {e}");
        }
    }

    fn bookmark_checks_enabled(&self) -> bool {
        match self.options.get_bool(OPT_CACHE_BOOKMARK_CHECKS) {
            Ok(enabled) => enabled,
            Err(e) => {
                log::warn!("could not read bookmark check option: {e}");
                false
            }
        }
    }

    fn bookmark_check_ttl_ms(&self) -> i64 {
        let minutes = self
            .options
            .get_u64(OPT_BOOKMARK_CHECK_TTL_MINUTES)
            .unwrap_or(30);
        (minutes as i64) * 60 * 1000
    }

    /// crc32 of the normalized URL. Non-cryptographic on purpose: a rare
    /// collision costs one wrong cache answer on an advisory path.
    fn bookmark_key(&self, url: &str) -> String {
        let normalized = self.normalizer.normalize(url, NormalizeOptions::default());
        format!("{:08x}", crc32fast::hash(normalized.as_bytes()))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Accept the shapes the server and older cache layouts produce: a bare
/// array of strings, an array of `{name}` objects, or a `{results: [...]}`
/// wrapper around either.
fn parse_name_list(value: &Value) -> Vec<String> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("results").and_then(Value::as_array) {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    array
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
            _ => None,
        })
        .collect()
}
