//! The seam between the connection state machine and the wire.
//!
//! A [`Transport`] implementation hands back a [`TransportLink`] — an
//! outbound command channel and an inbound event channel — per successful
//! handshake. [`WsTransport`] is the production implementation over
//! `tokio-tungstenite`; tests drive the state machine through in-process
//! channels instead.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, warn};

use crate::errors::SyncError;

/// Commands the socket hands to a transport's write side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireCommand {
    /// Transmit a JSON text frame.
    Frame(String),
    /// Close the connection with a normal-closure code.
    Close,
}

/// Events a transport reports to the socket's read side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireEvent {
    /// A text frame arrived.
    Frame(String),
    /// The connection ended. `graceful` is `true` for a close handshake,
    /// `false` for an abnormal drop.
    Closed {
        /// Whether the peer closed cleanly.
        graceful: bool,
    },
}

/// Channel pair for one live connection.
pub struct TransportLink {
    /// Outbound commands toward the wire.
    pub commands: mpsc::Sender<WireCommand>,
    /// Inbound frames and the final close event.
    pub events: mpsc::Receiver<WireEvent>,
}

/// Opens connections to the session endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the handshake and return the live link.
    async fn connect(&self, url: &str) -> Result<TransportLink, SyncError>;
}

/// Production transport over `tokio-tungstenite`.
pub struct WsTransport {
    queue_depth: usize,
}

impl WsTransport {
    /// Create a transport whose link channels hold `queue_depth` frames.
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        Self { queue_depth }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<TransportLink, SyncError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|error| SyncError::Handshake(error.to_string()))?;
        let (mut ws_tx, mut ws_rx) = socket.split();

        let (command_tx, mut command_rx) = mpsc::channel::<WireCommand>(self.queue_depth);
        let (event_tx, event_rx) = mpsc::channel::<WireEvent>(self.queue_depth);

        // Write side: forward frames until the channel closes or a Close
        // command arrives.
        let _write_task = tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    WireCommand::Frame(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    WireCommand::Close => {
                        let _ = ws_tx
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        });

        // Read side: forward text frames; report the close once.
        let _read_task = tokio::spawn(async move {
            let graceful = loop {
                match ws_rx.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if event_tx.send(WireEvent::Frame(text.to_string())).await.is_err() {
                            // Receiver went away; stop reading
                            break true;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => {
                            if event_tx
                                .send(WireEvent::Frame(text.to_owned()))
                                .await
                                .is_err()
                            {
                                break true;
                            }
                        }
                        Err(_) => {
                            debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) => break true,
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Err(error)) => {
                        warn!(%error, "websocket read error");
                        break false;
                    }
                    None => break false,
                }
            };
            let _ = event_tx.send(WireEvent::Closed { graceful }).await;
        });

        Ok(TransportLink {
            commands: command_tx,
            events: event_rx,
        })
    }
}
