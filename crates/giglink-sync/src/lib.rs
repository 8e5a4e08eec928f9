//! # giglink-sync
//!
//! The connection manager for the Giglink realtime engine: owns exactly
//! one logical connection per session and presents a stable
//! event-subscription API regardless of underlying transport churn.
//!
//! - [`ChatSocket`]: connection state machine with automatic reconnection
//!   (1 s doubling backoff capped at 30 s, abandoned after 10 consecutive
//!   failures), a 30 s heartbeat, and a subscriber registry for message
//!   and lifecycle events
//! - [`Transport`] / [`WsTransport`]: the seam between the state machine
//!   and `tokio-tungstenite`
//! - [`ChatSession`]: the application-root composition of socket, feed,
//!   and cache, with `start`/`stop` tied to login/logout

#![deny(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod errors;
pub mod registry;
pub mod session;
pub mod socket;
pub mod state;
pub mod transport;

pub use config::SyncConfig;
pub use errors::SyncError;
pub use registry::{SubscriberRegistry, Subscription};
pub use session::ChatSession;
pub use socket::ChatSocket;
pub use state::ConnectionState;
pub use transport::{Transport, TransportLink, WireCommand, WireEvent, WsTransport};
