//! DashMap-backed TTL cache keyed by (tenant, query type, canonical params).

use crate::config::CacheConfig;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Composite cache key. `params` holds the canonical serialization of the
/// parameter object so logically-equal parameter maps always collide onto
/// the same entry regardless of field insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant: String,
    query_type: String,
    params: String,
}

impl CacheKey {
    pub fn new(tenant: &str, query_type: &str, params: Option<&Value>) -> Self {
        Self {
            tenant: tenant.to_string(),
            query_type: query_type.to_string(),
            params: params.map(canonical_json).unwrap_or_default(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }
}

/// Serialize with recursively sorted object keys.
fn canonical_json(value: &Value) -> String {
    fn canonicalize(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<_, _> = map
                    .iter()
                    .map(|(key, inner)| (key.clone(), canonicalize(inner)))
                    .collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
            other => other.clone(),
        }
    }
    canonicalize(value).to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Hit/miss counters alongside the current entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache for parameterized query results.
///
/// Safe to share across tasks without an outer lock; every operation is a
/// single sharded-map access. Expired entries are purged lazily on `get` and
/// proactively by `cleanup()`; `len()` counts stale-but-unpurged entries.
#[derive(Debug)]
pub struct QueryCache<T: Clone = Value> {
    entries: DashMap<CacheKey, CacheEntry<T>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_ttl(config.default_ttl())
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a stored value. Expired entries are removed as a side effect
    /// and reported as misses.
    pub fn get(&self, tenant: &str, query_type: &str, params: Option<&Value>) -> Option<T> {
        let key = CacheKey::new(tenant, query_type, params);

        if let Some(entry) = self.entries.get(&key) {
            if Instant::now() < entry.expires_at {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(tenant, query_type, "Cache hit");
                return Some(entry.value.clone());
            }
        }

        // Stale or absent. Remove only if still expired, so a concurrent
        // overwrite with a fresh deadline is not lost.
        self.entries
            .remove_if(&key, |_, entry| Instant::now() >= entry.expires_at);
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(tenant, query_type, "Cache miss");
        None
    }

    /// Store a value with `ttl` (or the cache default). Overwrites any
    /// existing entry under the same key.
    pub fn set(
        &self,
        tenant: &str,
        query_type: &str,
        value: T,
        params: Option<&Value>,
        ttl: Option<Duration>,
    ) {
        let key = CacheKey::new(tenant, query_type, params);
        let ttl = ttl.unwrap_or(self.default_ttl);
        debug!(tenant, query_type, ttl_ms = ttl.as_millis() as u64, "Cached result");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Delete exactly the one matching entry.
    pub fn invalidate(&self, tenant: &str, query_type: &str, params: Option<&Value>) {
        let key = CacheKey::new(tenant, query_type, params);
        self.entries.remove(&key);
        debug!(tenant, query_type, "Invalidated cache entry");
    }

    /// Delete every entry belonging to a tenant, across all query types.
    pub fn invalidate_tenant(&self, tenant: &str) {
        self.entries.retain(|key, _| key.tenant != tenant);
        debug!(tenant, "Invalidated all cache entries for tenant");
    }

    /// Delete every entry of one query label, across all tenants.
    pub fn invalidate_query_type(&self, query_type: &str) {
        self.entries.retain(|key, _| key.query_type != query_type);
        debug!(query_type, "Invalidated all cache entries for query type");
    }

    /// Delete everything.
    pub fn clear(&self) {
        self.entries.clear();
        info!("Cleared entire query cache");
    }

    /// Current entry count, including expired entries not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Proactively remove all currently-expired entries. Not required for
    /// correctness since `get` self-purges; intended for periodic maintenance.
    pub fn cleanup(&self) {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Cache cleanup removed expired entries");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_with_ttl_ms(ms: u64) -> QueryCache {
        QueryCache::with_ttl(Duration::from_millis(ms))
    }

    #[test]
    fn test_round_trip() {
        let cache = cache_with_ttl_ms(5000);
        let params = json!({"grade": 12, "status": "active"});
        cache.set("u1", "student_list", json!(["alice"]), Some(&params), None);

        let hit = cache.get("u1", "student_list", Some(&params));
        assert_eq!(hit, Some(json!(["alice"])));
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let cache = cache_with_ttl_ms(5000);
        cache.set(
            "u1",
            "task_list",
            json!(42),
            Some(&json!({"a": 1, "b": {"y": 2, "x": 3}})),
            None,
        );

        let hit = cache.get("u1", "task_list", Some(&json!({"b": {"x": 3, "y": 2}, "a": 1})));
        assert_eq!(hit, Some(json!(42)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expiry_returns_none_and_purges() {
        let cache = cache_with_ttl_ms(20);
        cache.set("u1", "college_list", json!([1, 2]), None, None);
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("u1", "college_list", None), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_ttl_override_per_set() {
        let cache = cache_with_ttl_ms(10);
        cache.set(
            "u1",
            "essay_list",
            json!("draft"),
            None,
            Some(Duration::from_secs(60)),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("u1", "essay_list", None), Some(json!("draft")));
    }

    #[test]
    fn test_triples_never_collide() {
        let cache = cache_with_ttl_ms(5000);
        cache.set("u1", "q", json!(1), None, None);
        cache.set("u2", "q", json!(2), None, None);
        cache.set("u1", "r", json!(3), None, None);
        cache.set("u1", "q", json!(4), Some(&json!({"page": 2})), None);

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("u1", "q", None), Some(json!(1)));
        assert_eq!(cache.get("u2", "q", None), Some(json!(2)));
        assert_eq!(cache.get("u1", "r", None), Some(json!(3)));
        assert_eq!(cache.get("u1", "q", Some(&json!({"page": 2}))), Some(json!(4)));
    }

    #[test]
    fn test_invalidate_tenant_removes_all_and_only_that_tenant() {
        let cache = cache_with_ttl_ms(5000);
        cache.set("u1", "q", json!(1), None, None);
        cache.set("u1", "r", json!(2), Some(&json!({"x": 1})), None);
        cache.set("u2", "q", json!(3), None, None);

        cache.invalidate_tenant("u1");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("u1", "q", None), None);
        assert_eq!(cache.get("u2", "q", None), Some(json!(3)));
    }

    #[test]
    fn test_invalidate_query_type_spans_tenants() {
        let cache = cache_with_ttl_ms(5000);
        cache.set("u1", "student_list", json!(1), None, None);
        cache.set("u2", "student_list", json!(2), None, None);
        cache.set("u2", "task_list", json!(3), None, None);

        cache.invalidate_query_type("student_list");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("u2", "task_list", None), Some(json!(3)));
    }

    #[test]
    fn test_invalidate_single_entry() {
        let cache = cache_with_ttl_ms(5000);
        let params = json!({"page": 1});
        cache.set("u1", "q", json!(1), Some(&params), None);
        cache.set("u1", "q", json!(2), Some(&json!({"page": 2})), None);

        cache.invalidate("u1", "q", Some(&params));
        assert_eq!(cache.get("u1", "q", Some(&params)), None);
        assert_eq!(cache.get("u1", "q", Some(&json!({"page": 2}))), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_cleanup_purges_expired_only() {
        let cache = cache_with_ttl_ms(20);
        cache.set("u1", "stale", json!(1), None, None);
        cache.set("u1", "fresh", json!(2), None, Some(Duration::from_secs(60)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.len(), 2); // stale entry still counted pre-cleanup

        cache.cleanup();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("u1", "fresh", None), Some(json!(2)));
    }

    #[test]
    fn test_clear_and_stats() {
        let cache = cache_with_ttl_ms(5000);
        cache.set("u1", "q", json!(1), None, None);
        let _ = cache.get("u1", "q", None);
        let _ = cache.get("u1", "missing", None);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
