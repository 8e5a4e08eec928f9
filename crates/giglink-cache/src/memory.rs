//! In-memory cache backend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::store::CacheStore;

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `DashMap`-backed cache for tests and ephemeral sessions.
///
/// Shares the lazy-expiry semantics of the durable backend: expired
/// entries linger until read or swept.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of entries currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expiry_instant(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .map(|ttl| Utc::now() + ttl)
}

impl CacheStore for MemoryCache {
    fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) {
        let _ = self.entries.insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: expiry_instant(ttl),
            },
        );
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let now = Utc::now();
        let expired = {
            let entry = self.entries.get(key)?;
            if entry.is_expired(now) {
                true
            } else {
                return Some(entry.value.clone());
            }
        };
        if expired {
            let _ = self.entries.remove(key);
        }
        None
    }

    fn remove(&self, key: &str) {
        let _ = self.entries.remove(key);
    }

    fn clear_all(&self) {
        self.entries.clear();
    }

    fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    fn size_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| (entry.key().len() + entry.value().value.len()) as u64)
            .sum()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheExt;

    const SHORT_TTL: Duration = Duration::from_millis(20);

    fn past_ttl_elapsed() {
        std::thread::sleep(Duration::from_millis(40));
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        cache.set("greeting", &"hello".to_string(), None);
        assert_eq!(cache.get::<String>("greeting").as_deref(), Some("hello"));
    }

    #[test]
    fn get_missing_key_is_none() {
        let cache = MemoryCache::new();
        assert!(cache.get::<String>("absent").is_none());
    }

    #[test]
    fn entry_within_ttl_is_returned() {
        let cache = MemoryCache::new();
        cache.set("k", &42_u32, Some(Duration::from_secs(60)));
        assert_eq!(cache.get::<u32>("k"), Some(42));
    }

    #[test]
    fn expired_entry_returns_none() {
        let cache = MemoryCache::new();
        cache.set("k", &42_u32, Some(SHORT_TTL));
        past_ttl_elapsed();
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let cache = MemoryCache::new();
        cache.set("k", &1_u32, Some(SHORT_TTL));
        past_ttl_elapsed();
        let _ = cache.get::<u32>("k");
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn has_is_expiry_aware() {
        let cache = MemoryCache::new();
        cache.set("k", &1_u32, Some(SHORT_TTL));
        assert!(cache.has("k"));
        past_ttl_elapsed();
        assert!(!cache.has("k"));
    }

    #[test]
    fn overwrite_replaces_value_and_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", &1_u32, Some(SHORT_TTL));
        cache.set("k", &2_u32, None);
        past_ttl_elapsed();
        // Second write removed the TTL, so the entry survives
        assert_eq!(cache.get::<u32>("k"), Some(2));
    }

    #[test]
    fn remove_deletes_entry() {
        let cache = MemoryCache::new();
        cache.set("k", &1_u32, None);
        cache.remove("k");
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn remove_missing_key_is_noop() {
        let cache = MemoryCache::new();
        cache.remove("absent");
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_all_empties_store() {
        let cache = MemoryCache::new();
        cache.set("a", &1_u32, None);
        cache.set("b", &2_u32, Some(Duration::from_secs(60)));
        cache.clear_all();
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn clear_expired_evicts_exactly_the_expired() {
        let cache = MemoryCache::new();
        cache.set("stale", &1_u32, Some(SHORT_TTL));
        cache.set("fresh", &2_u32, Some(Duration::from_secs(60)));
        cache.set("forever", &3_u32, None);
        past_ttl_elapsed();

        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.get::<u32>("fresh"), Some(2));
        assert_eq!(cache.get::<u32>("forever"), Some(3));
        assert!(cache.get::<u32>("stale").is_none());
    }

    #[test]
    fn clear_expired_on_clean_store_removes_nothing() {
        let cache = MemoryCache::new();
        cache.set("k", &1_u32, None);
        assert_eq!(cache.clear_expired(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn typed_get_with_wrong_shape_is_soft_failure() {
        let cache = MemoryCache::new();
        cache.set_raw("k", "not json at all".into(), None);
        assert!(cache.get::<u32>("k").is_none());
    }

    #[test]
    fn size_bytes_counts_keys_and_values() {
        let cache = MemoryCache::new();
        cache.set_raw("ab", "1234".into(), None);
        assert_eq!(cache.size_bytes(), 6);
    }

    #[test]
    fn size_formatted_renders() {
        let cache = MemoryCache::new();
        cache.set_raw("k", "v".repeat(2048), None);
        assert!(cache.size_formatted().ends_with("KB"));
    }

    #[test]
    fn stores_structured_values() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Snapshot {
            endpoint: String,
            unread: u32,
        }
        let cache = MemoryCache::new();
        let snapshot = Snapshot {
            endpoint: "wss://chat.example/ws".into(),
            unread: 3,
        };
        cache.set("session", &snapshot, None);
        assert_eq!(cache.get::<Snapshot>("session"), Some(snapshot));
    }
}
