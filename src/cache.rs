//! In-process TTL cache shared by all aggregation calls.
//!
//! Entries expire `ttl` after insertion and are evicted lazily on the next
//! `get` of the same key; there is no background sweep. Concurrent writers
//! to one key race and the last write wins. Two requests that miss at the
//! same time both fetch from the remote host; results are identical, only
//! the work is duplicated.

use crate::nbt::Compound;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default entry lifetime (seconds)
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Millisecond clock; injectable so tests can move time by hand
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Monotonic milliseconds since the clock was created. Wall-clock jumps
/// (NTP, manual changes) do not stretch or cut short entry lifetimes.
pub fn system_clock() -> Clock {
    let start = Instant::now();
    Arc::new(move || i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX))
}

/// A cached value and the clock reading at insertion
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub inserted_at: i64,
    pub value: V,
}

/// String-keyed cache with per-entry expiry.
///
/// The value type is opaque to the cache; it only needs `Clone` so `get`
/// can hand out a copy (use `Arc<T>` for anything large).
pub struct TtlCache<V> {
    ttl_ms: i64,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    now_fn: Clock,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, now_fn: Clock) -> Self {
        Self {
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            entries: RwLock::new(HashMap::new()),
            now_fn,
        }
    }

    /// Value for `key` if it was inserted less than `ttl` ago.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = (self.now_fn)();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if self.is_fresh(entry, now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict, unless another writer refreshed it in between
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| !self.is_fresh(entry, now))
        {
            entries.remove(key);
            log::trace!("cache entry expired: {}", key);
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            inserted_at: (self.now_fn)(),
            value,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.max(0) as u64)
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: i64) -> bool {
        now.saturating_sub(entry.inserted_at) < self.ttl_ms
    }
}

/// Statistics object of one player (the value under `stats`, or the whole file)
pub type StatsObject = Arc<Map<String, Value>>;

/// Identifier -> last known display name
pub type NameMap = Arc<HashMap<String, String>>;

/// The three cache granularities the aggregator consults, sharing one TTL
/// and clock.
///
/// Keys follow the layout `usercache`, `stats:{uuid}`, `nbt:{uuid}`.
pub struct PlayerCache {
    names: TtlCache<NameMap>,
    stats: TtlCache<StatsObject>,
    trees: TtlCache<Arc<Compound>>,
}

impl PlayerCache {
    pub const USERCACHE_KEY: &'static str = "usercache";

    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, now_fn: Clock) -> Self {
        Self {
            names: TtlCache::with_clock(ttl, now_fn.clone()),
            stats: TtlCache::with_clock(ttl, now_fn.clone()),
            trees: TtlCache::with_clock(ttl, now_fn),
        }
    }

    pub fn names(&self) -> Option<NameMap> {
        self.names.get(Self::USERCACHE_KEY)
    }

    pub fn set_names(&self, names: NameMap) {
        self.names.set(Self::USERCACHE_KEY, names);
    }

    pub fn stats(&self, uuid: &str) -> Option<StatsObject> {
        self.stats.get(&stats_key(uuid))
    }

    pub fn set_stats(&self, uuid: &str, stats: StatsObject) {
        self.stats.set(stats_key(uuid), stats);
    }

    pub fn tree(&self, uuid: &str) -> Option<Arc<Compound>> {
        self.trees.get(&tree_key(uuid))
    }

    pub fn set_tree(&self, uuid: &str, tree: Arc<Compound>) {
        self.trees.set(tree_key(uuid), tree);
    }

    pub fn ttl(&self) -> Duration {
        self.stats.ttl()
    }
}

fn stats_key(uuid: &str) -> String {
    format!("stats:{}", uuid)
}

fn tree_key(uuid: &str) -> String {
    format!("nbt:{}", uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn manual_clock() -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(1_700_000_000_000));
        let handle = now.clone();
        (now, Arc::new(move || handle.load(Ordering::SeqCst)))
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = system_clock();
        let first = clock();
        assert!(first >= 0);
        std::thread::sleep(Duration::from_millis(5));
        let second = clock();
        assert!(second >= first + 5);

        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_entry_visible_until_ttl_boundary() {
        let (now, clock) = manual_clock();
        let cache: TtlCache<u32> = TtlCache::with_clock(Duration::from_secs(60), clock);
        let start = now.load(Ordering::SeqCst);

        cache.set("k", 7);
        assert_eq!(cache.get("k"), Some(7));

        now.store(start + 59_999, Ordering::SeqCst);
        assert_eq!(cache.get("k"), Some(7));

        now.store(start + 60_000, Ordering::SeqCst);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expired_entry_evicted_on_get() {
        let (now, clock) = manual_clock();
        let cache: TtlCache<String> = TtlCache::with_clock(Duration::from_secs(5), clock);
        cache.set("a", "x".to_string());
        cache.set("b", "y".to_string());
        assert_eq!(cache.len(), 2);

        now.fetch_add(10_000, Ordering::SeqCst);
        // Not evicted until read
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_refreshes_timestamp() {
        let (now, clock) = manual_clock();
        let cache: TtlCache<i32> = TtlCache::with_clock(Duration::from_secs(10), clock);
        cache.set("k", 1);
        now.fetch_add(8_000, Ordering::SeqCst);
        cache.set("k", 2);
        now.fetch_add(8_000, Ordering::SeqCst);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_ttl_property_over_several_ttls() {
        for ttl_secs in [1u64, 7, 60, 3600] {
            let (now, clock) = manual_clock();
            let cache: TtlCache<u64> = TtlCache::with_clock(Duration::from_secs(ttl_secs), clock);
            let inserted = now.load(Ordering::SeqCst);
            cache.set("k", ttl_secs);
            let ttl_ms = (ttl_secs * 1000) as i64;
            for offset in [0, 1, ttl_ms / 2, ttl_ms - 1] {
                now.store(inserted + offset, Ordering::SeqCst);
                assert_eq!(cache.get("k"), Some(ttl_secs), "ttl {} offset {}", ttl_secs, offset);
            }
            now.store(inserted + ttl_ms, Ordering::SeqCst);
            assert_eq!(cache.get("k"), None);
        }
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(TtlCache::<usize>::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cache.set(format!("k{}", i % 10), t * 1000 + i);
                        let _ = cache.get(&format!("k{}", (i + 3) % 10));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
        assert!(cache.get("k0").is_some());
    }

    #[test]
    fn test_player_cache_keys_are_independent() {
        let (_now, clock) = manual_clock();
        let cache = PlayerCache::with_clock(Duration::from_secs(60), clock);
        let uuid = "0f3c0b7e-1111-2222-3333-444455556666";

        assert!(cache.stats(uuid).is_none());
        cache.set_stats(uuid, Arc::new(Map::new()));
        assert!(cache.stats(uuid).is_some());
        assert!(cache.tree(uuid).is_none());

        cache.set_tree(uuid, Arc::new(Compound::new()));
        assert!(cache.tree(uuid).is_some());

        let mut names = HashMap::new();
        names.insert(uuid.to_string(), "Alex".to_string());
        cache.set_names(Arc::new(names));
        assert_eq!(cache.names().unwrap().get(uuid).map(String::as_str), Some("Alex"));
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }
}
