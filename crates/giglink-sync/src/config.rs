//! Connection manager configuration.

use serde::{Deserialize, Serialize};

use crate::backoff::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS};

/// Configuration for a [`ChatSocket`](crate::ChatSocket).
///
/// The embedding application constructs this with the per-session
/// endpoint URL; everything else defaults to the production policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Per-session WebSocket endpoint.
    pub url: String,
    /// Keepalive interval while connected, in seconds.
    pub heartbeat_interval_secs: u64,
    /// First reconnect delay, in milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Reconnect delay ceiling, in milliseconds.
    pub reconnect_max_delay_ms: u64,
    /// Consecutive failures before reconnection is abandoned.
    pub max_reconnect_attempts: u32,
    /// Depth of the outbound frame queue.
    pub send_queue_depth: usize,
}

impl SyncConfig {
    /// Config for the given endpoint with default policy values.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".into(),
            heartbeat_interval_secs: 30,
            reconnect_base_delay_ms: DEFAULT_BASE_DELAY_MS,
            reconnect_max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            send_queue_depth: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_heartbeat_interval() {
        assert_eq!(SyncConfig::default().heartbeat_interval_secs, 30);
    }

    #[test]
    fn default_backoff_policy() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.reconnect_base_delay_ms, 1_000);
        assert_eq!(cfg.reconnect_max_delay_ms, 30_000);
        assert_eq!(cfg.max_reconnect_attempts, 10);
    }

    #[test]
    fn new_keeps_policy_defaults() {
        let cfg = SyncConfig::new("wss://chat.example/ws");
        assert_eq!(cfg.url, "wss://chat.example/ws");
        assert_eq!(cfg.send_queue_depth, 256);
    }

    #[test]
    fn serde_round_trip() {
        let cfg = SyncConfig::new("wss://chat.example/ws");
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, cfg.url);
        assert_eq!(back.max_reconnect_attempts, cfg.max_reconnect_attempts);
    }
}
