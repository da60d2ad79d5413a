//! Per-operation TTL cache behind a narrow interface.
//!
//! Adapters and the sync pipeline depend only on the `Cache` trait, so the
//! in-process map can be swapped for an external store without touching
//! call sites. Failed lookups are never written (no negative caching).

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::util::env::env_parse;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// The two freshness classes: catalog/style data is long-lived, inventory
/// is short-lived. Both independently env-tunable.
#[derive(Debug, Clone, Copy)]
pub struct TtlConfig {
    pub catalog_ttl: Duration,
    pub inventory_ttl: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            catalog_ttl: Duration::from_secs(6 * 3600),
            inventory_ttl: Duration::from_secs(20 * 60),
        }
    }
}

impl TtlConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            catalog_ttl: Duration::from_secs(env_parse(
                "CATALOG_TTL_SECS",
                d.catalog_ttl.as_secs(),
            )),
            inventory_ttl: Duration::from_secs(env_parse(
                "INVENTORY_TTL_SECS",
                d.inventory_ttl.as_secs(),
            )),
        }
    }
}

/// Build a cache key from an operation name and its normalized parameters.
/// Parameters are sorted and lowercased so equivalent calls collide.
pub fn cache_key(op: &str, params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k.to_ascii_lowercase(), v.trim().to_ascii_lowercase()))
        .collect();
    pairs.sort();
    format!("{}:{}", op, pairs.join("&"))
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache with lazy expiry on read. Key-scoped, last-write-wins;
/// the interior mutex is the only locking involved.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut map = self.inner.lock().ok()?;
        if let Some(entry) = map.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        // Expired entry: evict on read.
        map.remove(key);
        None
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_within_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", json!({"n": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!({"n": 1})));
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn keys_normalize_param_order_and_case() {
        let a = cache_key("inventory", &[("styleid", "2000"), ("force", "FALSE")]);
        let b = cache_key("inventory", &[("FORCE", "false"), ("STYLEID", "2000 ")]);
        assert_eq!(a, b);
        let c = cache_key("inventory", &[("styleid", "2001")]);
        assert_ne!(a, c);
    }

    #[test]
    fn last_write_wins() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::from_secs(60));
        cache.set("k", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }
}
