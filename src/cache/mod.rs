//! In-memory cache for GET responses
//!
//! Entries are keyed by the exact request URL (path and query string) and
//! expire after a fixed TTL. Expiry is checked on read; there is no size bound
//! and no background eviction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::client::normalize::Normalized;

/// Cache TTL configuration
pub struct CacheTtl;

impl CacheTtl {
    /// Default lifetime of a cached GET response
    pub const DEFAULT: Duration = Duration::from_millis(crate::config::DEFAULT_CACHE_TTL_MS);
}

/// A cached response and the time it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Normalized,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: Normalized) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Whether the entry is younger than `ttl` at `now`.
    ///
    /// Entries stamped in the future (clock moved backwards) count as stale.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age < ttl,
            Err(_) => false,
        }
    }
}

/// URL-keyed response cache with TTL-on-read expiry
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheTtl::DEFAULT)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<Normalized> {
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries.get(key)?.is_fresh_at(Utc::now(), self.ttl);
        if fresh {
            entries.get(key).map(|entry| entry.data.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    /// Store data under `key`, replacing any previous entry
    pub fn put(&self, key: &str, data: Normalized) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry::new(data));
        }
    }

    /// Remove every entry whose key starts with `prefix`, returning how many were removed
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|key, _| !key.starts_with(prefix));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::normalize::normalize;
    use serde_json::json;

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = ResponseCache::default();
        cache.put("/api/v1/devices?page=1", normalize(&json!({"a": 1})));

        let hit = cache.get("/api/v1/devices?page=1").unwrap();
        assert_eq!(hit.get("A").and_then(Normalized::as_i64), Some(1));
        assert!(cache.get("/api/v1/devices?page=2").is_none());
    }

    #[test]
    fn test_expired_entry_is_dropped_on_read() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.put("/k", Normalized::Bool(true));
        assert_eq!(cache.len(), 1);

        assert!(cache.get("/k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_freshness_boundaries() {
        let entry = CacheEntry::new(Normalized::Null);
        let ttl = Duration::from_secs(60);

        assert!(entry.is_fresh_at(entry.timestamp, ttl));
        assert!(entry.is_fresh_at(entry.timestamp + chrono::Duration::seconds(59), ttl));
        assert!(!entry.is_fresh_at(entry.timestamp + chrono::Duration::seconds(60), ttl));
        assert!(!entry.is_fresh_at(entry.timestamp - chrono::Duration::seconds(1), ttl));
    }

    #[test]
    fn test_put_replaces_entry() {
        let cache = ResponseCache::default();
        cache.put("/k", Normalized::Bool(false));
        cache.put("/k", Normalized::Bool(true));
        assert_eq!(cache.get("/k"), Some(Normalized::Bool(true)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_prefix_and_clear() {
        let cache = ResponseCache::default();
        cache.put("http://x/api/v1/devices", Normalized::Null);
        cache.put("http://x/api/v1/devices?page=2", Normalized::Null);
        cache.put("http://x/api/v1/audit", Normalized::Null);

        assert_eq!(cache.invalidate_prefix("http://x/api/v1/devices"), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
