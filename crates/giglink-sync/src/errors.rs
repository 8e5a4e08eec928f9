//! Connection-level errors.
//!
//! Transport failures recover locally through the reconnect policy and
//! reach subscribers only as state transitions; the error values here
//! surface to the caller of an explicit `connect()` and in logs.

use thiserror::Error;

use giglink_core::WireError;

/// Errors raised by the connection manager.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The transport could not be established.
    #[error("transport handshake failed: {0}")]
    Handshake(String),

    /// Operation requires a live connection.
    #[error("not connected")]
    NotConnected,

    /// Reconnection abandoned after the consecutive-failure cap.
    #[error("reconnect attempts exhausted after {attempts} consecutive failures")]
    Exhausted {
        /// Failures since the last successful connection.
        attempts: u32,
    },

    /// Wire encode/decode failure.
    #[error(transparent)]
    Wire(#[from] WireError),
}
