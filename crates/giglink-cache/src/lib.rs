//! # giglink-cache
//!
//! Expiring key/value storage for session bootstrap data.
//!
//! The [`CacheStore`] trait fronts two backends: [`MemoryCache`] for tests
//! and ephemeral sessions, and [`SqliteCache`] for durable state (the only
//! on-disk state the realtime engine owns). Entries carry an optional
//! absolute expiry instant; expired entries are evicted lazily on read,
//! with [`CacheStore::clear_expired`] available as a one-shot sweep.
//!
//! Serialization failures are soft: the typed [`CacheExt`] helpers log at
//! `warn` and return `None`/no-op rather than propagating errors past the
//! store boundary.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod sqlite;
mod store;

pub use errors::CacheError;
pub use memory::MemoryCache;
pub use sqlite::{ConnectionConfig, SqliteCache};
pub use store::{CacheExt, CacheStore, format_size};
