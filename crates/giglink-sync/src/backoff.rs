//! Reconnect backoff calculation.
//!
//! Portable sync-only math; the async scheduling lives in
//! [`socket`](crate::socket). The delay is deterministic — the policy
//! fixes a doubling schedule, no jitter.

use std::time::Duration;

/// Default base delay for the first reconnect attempt.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Default delay ceiling.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default consecutive-failure cap before reconnection is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Delay before the Nth reconnect attempt (1-based).
///
/// Formula: `min(base * 2^(attempt-1), max)`. Attempt counting resets on
/// any successful connection.
#[must_use]
pub fn reconnect_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let delay_ms = if exponent >= 32 {
        max_delay_ms
    } else {
        base_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(max_delay_ms)
    };
    Duration::from_millis(delay_ms)
}
