//! The `CacheStore` trait and typed access helpers.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// TTL-qualified key/value storage, decoupled from any backing medium.
///
/// Implementations store opaque serialized strings; typed access goes
/// through [`CacheExt`]. Expiry semantics are shared by all backends:
/// an entry with a recorded expiry instant in the past is evicted on
/// read (both value and expiry records removed) and reported as absent.
pub trait CacheStore: Send + Sync {
    /// Store a serialized value, with an optional time-to-live.
    ///
    /// A `ttl` is converted to an absolute expiry instant at write time.
    /// Overwrites any existing entry (and its expiry) under `key`.
    fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>);

    /// Fetch a serialized value, evicting it first if expired.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Remove an entry and its expiry record. No-op when absent.
    fn remove(&self, key: &str);

    /// Remove every entry. No entry outlives this call.
    fn clear_all(&self);

    /// One-shot sweep: evict every TTL-tagged entry past its expiry,
    /// independent of any `get` call. Returns the number evicted.
    fn clear_expired(&self) -> usize;

    /// Expiry-aware existence check, equivalent to `get_raw(key).is_some()`.
    fn has(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Approximate stored size in bytes. Informational only.
    fn size_bytes(&self) -> u64;

    /// Human-readable rendering of [`CacheStore::size_bytes`].
    fn size_formatted(&self) -> String {
        format_size(self.size_bytes())
    }
}

/// Typed `set`/`get` over any [`CacheStore`].
///
/// Serialization failures are soft failures: logged at `warn`, the store
/// is left untouched (`set`) or the entry reported absent (`get`).
pub trait CacheExt: CacheStore {
    /// Serialize and store a value.
    fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, raw, ttl),
            Err(error) => {
                warn!(key, %error, "failed to serialize cache value; entry not written");
            }
        }
    }

    /// Fetch and deserialize a value, `None` when absent, expired, or
    /// undecodable.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "failed to deserialize cache value");
                None
            }
        }
    }
}

impl<S: CacheStore + ?Sized> CacheExt for S {}

/// Format a byte count as `B` / `KB` / `MB` with one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
