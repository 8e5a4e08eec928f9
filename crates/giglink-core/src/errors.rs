//! Wire-level errors.
//!
//! A malformed inbound frame is a protocol-level failure: it is logged and
//! dropped by the connection manager, never allowed to tear down the
//! connection. Encoding failures on the outbound path are equally
//! non-fatal — the frame is simply not transmitted.

use thiserror::Error;

/// Errors produced while decoding or encoding JSON wire frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// Inbound frame could not be parsed into an [`InboundEvent`].
    ///
    /// [`InboundEvent`]: crate::events::InboundEvent
    #[error("malformed inbound frame: {source}")]
    Malformed {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Outbound frame could not be serialized.
    #[error("failed to encode outbound frame: {source}")]
    Encode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
