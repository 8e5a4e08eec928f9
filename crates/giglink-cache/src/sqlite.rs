//! Durable `SQLite` cache backend.
//!
//! Uses `r2d2` connection pooling with the `r2d2_sqlite` manager. The
//! [`PragmaCustomizer`] runs on each new connection to ensure WAL mode,
//! a busy timeout, and relaxed synchronous writes are set.
//!
//! All entries live in a single `cache_entries` table; `expires_at` is a
//! unix-milliseconds column, `NULL` for entries without a TTL.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use crate::errors::Result;
use crate::store::CacheStore;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Configuration for the connection pool.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 30000).
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// `SQLite` pragma customizer that runs on each new connection.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))?;
        Ok(())
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    expires_at INTEGER
)";

/// Durable cache over a pooled `SQLite` database.
pub struct SqliteCache {
    pool: ConnectionPool,
}

impl SqliteCache {
    /// Create an in-memory cache (for testing).
    ///
    /// The pool is clamped to a single connection: separate pooled
    /// connections to `:memory:` would each see a private database.
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: ConnectionConfig::default().busy_timeout_ms,
            }))
            .build(manager)?;
        Self::with_pool(pool)
    }

    /// Create a file-backed cache.
    pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build(manager)?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: ConnectionPool) -> Result<Self> {
        let cache = Self { pool };
        let _ = cache.conn()?.execute(SCHEMA, [])?;
        Ok(cache)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn try_set(&self, key: &str, value: &str, expires_at: Option<i64>) -> Result<()> {
        let _ = self.conn()?.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    fn try_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((value, expires_at)) = row else {
            return Ok(None);
        };
        if expires_at.is_some_and(|at| at <= Utc::now().timestamp_millis()) {
            let _ = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn try_clear_expired(&self) -> Result<usize> {
        Ok(self.conn()?.execute(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![Utc::now().timestamp_millis()],
        )?)
    }
}

fn expiry_millis(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| {
        Utc::now().timestamp_millis() + i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    })
}

impl CacheStore for SqliteCache {
    fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) {
        if let Err(error) = self.try_set(key, &value, expiry_millis(ttl)) {
            warn!(key, %error, "cache write failed");
        }
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "cache read failed");
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        let result = self
            .conn()
            .and_then(|conn| {
                Ok(conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?)
            });
        if let Err(error) = result {
            warn!(key, %error, "cache remove failed");
        }
    }

    fn clear_all(&self) {
        let result = self
            .conn()
            .and_then(|conn| Ok(conn.execute("DELETE FROM cache_entries", [])?));
        if let Err(error) = result {
            warn!(%error, "cache clear failed");
        }
    }

    fn clear_expired(&self) -> usize {
        match self.try_clear_expired() {
            Ok(evicted) => evicted,
            Err(error) => {
                warn!(%error, "cache sweep failed");
                0
            }
        }
    }

    fn size_bytes(&self) -> u64 {
        let result: Result<i64> = self.conn().and_then(|conn| {
            Ok(conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM cache_entries",
                [],
                |row| row.get(0),
            )?)
        });
        match result {
            Ok(bytes) => u64::try_from(bytes).unwrap_or(0),
            Err(error) => {
                warn!(%error, "cache size query failed");
                0
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
