//! In-memory TTL cache shared by the retrieval adapters.
//!
//! Entries expire a fixed duration after insertion and are purged lazily on
//! read. There is no eviction beyond TTL; the expected request volume is low
//! enough that unbounded size is acceptable. State lives in process memory
//! only and resets on restart.

use std::collections::HashMap;
use std::fmt::Display;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key-value store with per-entry expiry, safe for concurrent access from
/// multiple in-flight fan-out calls.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up a live entry. An expired entry is deleted and reported absent.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    /// Stores a value with the configured TTL from now.
    pub async fn set(&self, key: &str, value: V) {
        self.set_at(key, value, Instant::now()).await;
    }

    /// Drops all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drops every expired entry in one pass.
    pub async fn purge_expired(&self) {
        self.purge_expired_at(Instant::now()).await;
    }

    async fn purge_expired_at(&self, now: Instant) {
        self.entries.write().await.retain(|_, entry| now < entry.expires_at);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set_at(&self, key: &str, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }
}

/// Builds normalized, order-independent cache keys.
///
/// The field order is fixed by the caller and absent filters are rendered
/// explicitly, so semantically identical requests collide regardless of
/// call-site formatting:
/// `catalog_search:query:wooden puzzle|price_min:none|top_k:5`
pub struct CacheKeyBuilder {
    parts: Vec<String>,
}

impl CacheKeyBuilder {
    pub fn new(prefix: &str) -> Self {
        Self {
            parts: vec![prefix.to_string()],
        }
    }

    /// Adds the query text, lowercased and trimmed.
    pub fn query(mut self, query: &str) -> Self {
        self.parts.push(format!("query:{}", query.trim().to_lowercase()));
        self
    }

    pub fn field(mut self, name: &str, value: impl Display) -> Self {
        self.parts.push(format!("{name}:{value}"));
        self
    }

    pub fn opt_field(mut self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(v) => self.parts.push(format!("{name}:{v}")),
            None => self.parts.push(format!("{name}:none")),
        }
        self
    }

    pub fn build(self) -> String {
        let mut iter = self.parts.into_iter();
        let prefix = iter.next().unwrap_or_default();
        let rest: Vec<String> = iter.collect();
        if rest.is_empty() {
            prefix
        } else {
            format!("{}:{}", prefix, rest.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_live_entry() {
        let cache: TtlCache<String> = TtlCache::default();
        cache.set("k", "v".to_string()).await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_is_deleted_on_read() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(300));
        let base = Instant::now();
        cache.set_at("k", 7, base).await;

        // One second before expiry: still present
        assert_eq!(cache.get_at("k", base + Duration::from_secs(299)).await, Some(7));
        // At expiry: gone, and physically removed
        assert_eq!(cache.get_at("k", base + Duration::from_secs(300)).await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn identical_normalized_params_hit_same_entry() {
        let key_a = CacheKeyBuilder::new("catalog_search")
            .query("  Wooden Puzzle ")
            .opt_field("price_min", None::<f64>)
            .opt_field("price_max", Some(20.0))
            .field("top_k", 5)
            .build();
        let key_b = CacheKeyBuilder::new("catalog_search")
            .query("wooden puzzle")
            .opt_field("price_min", None::<f64>)
            .opt_field("price_max", Some(20.0))
            .field("top_k", 5)
            .build();
        assert_eq!(key_a, key_b);
        assert_eq!(key_a, "catalog_search:query:wooden puzzle|price_min:none|price_max:20|top_k:5");

        let cache: TtlCache<u32> = TtlCache::default();
        cache.set(&key_a, 1).await;
        assert_eq!(cache.get(&key_b).await, Some(1));
    }

    #[tokio::test]
    async fn differing_filters_miss() {
        let key_a = CacheKeyBuilder::new("catalog_search")
            .query("puzzle")
            .opt_field("eco", Some(true))
            .build();
        let key_b = CacheKeyBuilder::new("catalog_search")
            .query("puzzle")
            .opt_field("eco", None::<bool>)
            .build();
        assert_ne!(key_a, key_b);
    }

    #[tokio::test]
    async fn clear_and_purge() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10));
        let base = Instant::now();
        cache.set_at("dead", 2, base).await;
        cache.set_at("live", 1, base + Duration::from_secs(15)).await;

        assert_eq!(cache.len().await, 2);
        // 20s after the first insert: "dead" is past its 10s TTL, "live" is not
        cache.purge_expired_at(base + Duration::from_secs(20)).await;
        assert_eq!(cache.get_at("live", base + Duration::from_secs(20)).await, Some(1));
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_reads_and_writes() {
        use std::sync::Arc;

        let cache: Arc<TtlCache<usize>> = Arc::new(TtlCache::default());
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("k{}", i % 4);
                cache.set(&key, i).await;
                cache.get(&key).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
    }
}
