//! Response caches for the index client, one per endpoint.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use moka::sync::Cache as MokaCache;

use crate::types::models::mod_entity::{ModListResult, ModRecord};
use crate::types::models::mod_update::UpdateRecord;
use crate::types::query::ModsQuery;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// `None` keeps entries until the caches are cleared.
    pub ttl: Option<Duration>,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl: Some(Duration::from_secs(600)),
            max_entries: 256,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Clone)]
pub struct ResponseCache<K, V> {
    name: &'static str,
    cache: MokaCache<K, Arc<CacheEntry<V>>>,
    ttl: Option<Duration>,
}

impl<K, V> ResponseCache<K, V>
where
    K: Hash + Eq + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_entries);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        ResponseCache {
            name,
            cache: builder.build(),
            ttl: config.ttl,
        }
    }

    /// Returns the value if it is still inside the freshness window. Stale
    /// entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let Some(entry) = self.cache.get(key) else {
            log::debug!("{} cache miss: {:?}", self.name, key);
            return None;
        };

        // moka expires lazily, check the window ourselves
        if let Some(ttl) = self.ttl {
            if entry.inserted_at.elapsed() >= ttl {
                log::debug!("{} cache entry expired: {:?}", self.name, key);
                self.cache.invalidate(key);
                return None;
            }
        }

        log::debug!("{} cache hit: {:?}", self.name, key);
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.cache.insert(
            key,
            Arc::new(CacheEntry {
                value,
                inserted_at: Instant::now(),
            }),
        );
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

/// Every cache the client keeps. Tags are global data and survive a
/// non-global clear.
#[derive(Clone)]
pub struct ServerCaches {
    pub mods: ResponseCache<ModsQuery, ModListResult>,
    pub mod_by_id: ResponseCache<String, ModRecord>,
    pub logos: ResponseCache<String, Bytes>,
    pub tags: ResponseCache<(), BTreeSet<String>>,
    pub updates: ResponseCache<BTreeSet<String>, Vec<UpdateRecord>>,
}

impl ServerCaches {
    pub fn new(config: &CacheConfig) -> ServerCaches {
        ServerCaches {
            mods: ResponseCache::new("mods", config),
            mod_by_id: ResponseCache::new("mod", config),
            logos: ResponseCache::new("logo", config),
            tags: ResponseCache::new("tags", config),
            updates: ResponseCache::new("updates", config),
        }
    }

    pub fn clear(&self, clear_global: bool) {
        self.mods.clear();
        self.mod_by_id.clear();
        self.logos.clear();
        self.updates.clear();
        if clear_global {
            self.tags.clear();
        }
        log::debug!("Cleared server caches (global: {})", clear_global);
    }
}

impl Default for ServerCaches {
    fn default() -> Self {
        ServerCaches::new(&CacheConfig::default())
    }
}
