//! # TTL Query Cache
//!
//! Per-tenant, per-query-type memoization of query results with expiry.
//! Avoids redundant reads for identical parameterized queries repeated
//! within a short window (a list view re-fetched on every navigation).
//!
//! The cache is purely in-process memory: losing it on restart is
//! correctness-safe, and callers must invalidate explicitly after any
//! mutation affecting cached data — there is no invalidation-on-write
//! wiring.
//!
//! ## Usage
//!
//! ```rust
//! use counsel_core::cache::QueryCache;
//! use counsel_core::config::CacheConfig;
//! use serde_json::json;
//!
//! let cache = QueryCache::new(CacheConfig::default());
//!
//! cache.set("counselor-1", "student_list", json!(["alice", "bob"]), Some(&json!({"grade": 12})), None);
//! let hit = cache.get("counselor-1", "student_list", Some(&json!({"grade": 12})));
//! assert!(hit.is_some());
//!
//! cache.invalidate_tenant("counselor-1");
//! assert_eq!(cache.len(), 0);
//! ```

pub mod query_cache;

pub use query_cache::{CacheKey, CacheStats, QueryCache};
