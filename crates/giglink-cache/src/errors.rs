//! Cache-internal error types.
//!
//! These never cross the public store surface: [`CacheStore`] operations
//! degrade to `None`/no-op and log at `warn` instead. The error type
//! exists for backend constructors and internal plumbing.
//!
//! [`CacheStore`]: crate::CacheStore

use thiserror::Error;

/// Alias for cache-internal results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised inside a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Value (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
