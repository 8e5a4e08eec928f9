//! Connection state machine vocabulary.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the session's logical connection.
///
/// Exactly one instance exists per session, owned and mutated only by the
/// connection manager; subscribers observe transitions through the
/// connect/disconnect registries.
///
/// Transitions: `Disconnected → Connecting → Connected → Disconnected`
/// on graceful or abnormal close; `Connecting → Error` on immediate
/// failure to establish; `Disconnected → Error` when reconnection is
/// abandoned after the attempt cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport; a reconnect may be pending.
    Disconnected,
    /// Transport handshake in flight.
    Connecting,
    /// Live connection; heartbeat running.
    Connected,
    /// Terminal failure — requires an explicit `connect()` to retry.
    Error,
}

impl ConnectionState {
    /// Returns `true` when frames can be transmitted.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Error.is_connected());
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
    }
}
