//! Package-level constants.

/// Current version of the Giglink engine (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "giglink";

/// Window within which a server echo is matched against an optimistic
/// send by the recency heuristic (milliseconds).
pub const DEDUP_WINDOW_MS: i64 = 5_000;
