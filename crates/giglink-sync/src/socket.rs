//! Connection state machine with reconnection and heartbeat.
//!
//! [`ChatSocket`] owns exactly one logical connection per session. Two
//! named timer tasks exist alongside it, each owned through a
//! `CancellationToken` slot so that at most one of each can be
//! outstanding:
//!
//! - **heartbeat** — transmits a `{"type":"ping"}` frame every
//!   `heartbeat_interval_secs` while connected. A transmit failure only
//!   stops the timer; the transport's own close event drives the state
//!   machine, avoiding a double-reconnect race.
//! - **reconnect** — armed on any non-intentional close, fires a single
//!   attempt after the current backoff delay. Failed attempts re-arm with
//!   a doubled delay until the consecutive-failure cap, at which point
//!   the state becomes [`ConnectionState::Error`] and recovery requires
//!   an explicit [`ChatSocket::connect`].
//!
//! Each successful transport open bumps an epoch counter; close events
//! from a superseded transport are ignored, so a stale reader can never
//! disturb a newer connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use giglink_core::events::{InboundEvent, OutboundFrame, parse_inbound};
use giglink_core::ids::{ConversationId, MessageId};
use giglink_core::message::MessageKind;

use crate::backoff::reconnect_delay;
use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::registry::{SubscriberRegistry, Subscription};
use crate::state::ConnectionState;
use crate::transport::{Transport, WireCommand, WireEvent};

struct SocketInner {
    config: SyncConfig,
    transport: Arc<dyn Transport>,
    registry: SubscriberRegistry,
    state: Mutex<ConnectionState>,
    /// Set only by an explicit `disconnect()`; suppresses auto-reconnect.
    intentional_close: AtomicBool,
    /// Consecutive failed reconnect attempts since the last success.
    failed_attempts: AtomicU32,
    /// Bumped on every transport open and on `disconnect()`; stale
    /// readers compare against it and stand down.
    epoch: AtomicU64,
    commands: Mutex<Option<mpsc::Sender<WireCommand>>>,
    heartbeat: Mutex<Option<CancellationToken>>,
    reconnect: Mutex<Option<CancellationToken>>,
}

/// The session's connection manager.
///
/// Cheap to clone — clones share the same underlying connection and
/// subscriber registries. One instance is shared by every screen that
/// needs chat events.
#[derive(Clone)]
pub struct ChatSocket {
    inner: Arc<SocketInner>,
}

impl ChatSocket {
    /// Create a socket for the given endpoint and transport. No
    /// connection is opened until [`ChatSocket::connect`].
    #[must_use]
    pub fn new(config: SyncConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                config,
                transport,
                registry: SubscriberRegistry::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                intentional_close: AtomicBool::new(false),
                failed_attempts: AtomicU32::new(0),
                epoch: AtomicU64::new(0),
                commands: Mutex::new(None),
                heartbeat: Mutex::new(None),
                reconnect: Mutex::new(None),
            }),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// The socket's configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Open the connection.
    ///
    /// Resolves immediately when already connected or a connect is in
    /// flight. On success the attempt counter and backoff reset and the
    /// heartbeat starts; on failure the state becomes
    /// [`ConnectionState::Error`] and the failure propagates.
    pub async fn connect(&self) -> Result<(), SyncError> {
        {
            let mut state = self.inner.state.lock();
            if matches!(
                *state,
                ConnectionState::Connected | ConnectionState::Connecting
            ) {
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }
        self.inner.intentional_close.store(false, Ordering::SeqCst);
        // An explicit connect supersedes any pending reconnect timer
        self.cancel_reconnect();

        match self.open_transport().await {
            Ok(()) => Ok(()),
            Err(error) => {
                *self.inner.state.lock() = ConnectionState::Error;
                warn!(url = %self.inner.config.url, %error, "connection failed");
                Err(error)
            }
        }
    }

    /// Close the connection and suppress automatic reconnection.
    ///
    /// Cancels both timers, closes the transport with a normal-closure
    /// code, and leaves the socket in a clean slate for a later
    /// [`ChatSocket::connect`]. Idempotent.
    pub fn disconnect(&self) {
        self.inner.intentional_close.store(true, Ordering::SeqCst);
        // Invalidate any in-flight reader before tearing down
        let _ = self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.stop_heartbeat();
        self.cancel_reconnect();

        if let Some(commands) = self.inner.commands.lock().take() {
            let _ = commands.try_send(WireCommand::Close);
        }

        let was_connected = {
            let mut state = self.inner.state.lock();
            let was_connected = *state == ConnectionState::Connected;
            *state = ConnectionState::Disconnected;
            was_connected
        };
        if was_connected {
            info!("disconnected");
            self.inner.registry.emit_disconnect();
        }
    }

    async fn open_transport(&self) -> Result<(), SyncError> {
        let link = self
            .inner
            .transport
            .connect(&self.inner.config.url)
            .await?;
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.commands.lock() = Some(link.commands);
        *self.inner.state.lock() = ConnectionState::Connected;
        self.inner.failed_attempts.store(0, Ordering::SeqCst);
        self.start_heartbeat();
        self.spawn_reader(epoch, link.events);
        info!(url = %self.inner.config.url, "connected");
        self.inner.registry.emit_connect();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sending
    // ─────────────────────────────────────────────────────────────────────

    /// Transmit a chat message.
    ///
    /// Returns `false` without side effects when not connected — the
    /// socket never buffers on the caller's behalf.
    pub fn send(&self, conversation_id: &ConversationId, text: &str, kind: MessageKind) -> bool {
        self.send_frame(&OutboundFrame::message(
            conversation_id.clone(),
            text.to_owned(),
            kind,
            None,
        ))
    }

    /// Transmit a typing indicator. Best-effort: silent no-op when not
    /// connected.
    pub fn send_typing(&self, conversation_id: &ConversationId) {
        let _ = self.send_frame(&OutboundFrame::Typing {
            conversation_id: conversation_id.clone(),
        });
    }

    /// Transmit a read receipt. Best-effort: silent no-op when not
    /// connected.
    pub fn mark_read(&self, message_id: &MessageId) {
        let _ = self.send_frame(&OutboundFrame::MarkRead {
            message_id: message_id.clone(),
        });
    }

    /// Serialize and transmit a frame. Returns `true` when the frame was
    /// handed to the wire queue.
    pub fn send_frame(&self, frame: &OutboundFrame) -> bool {
        if !self.state().is_connected() {
            return false;
        }
        let json = match frame.to_json() {
            Ok(json) => json,
            Err(error) => {
                warn!(%error, "dropping unencodable outbound frame");
                return false;
            }
        };
        let commands = self.inner.commands.lock();
        commands
            .as_ref()
            .is_some_and(|sender| sender.try_send(WireCommand::Frame(json)).is_ok())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Subscribe to inbound events.
    pub fn on_message(
        &self,
        handler: impl Fn(&InboundEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.registry.on_message(handler)
    }

    /// Subscribe to connect transitions.
    pub fn on_connect(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.registry.on_connect(handler)
    }

    /// Subscribe to disconnect transitions.
    pub fn on_disconnect(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.registry.on_disconnect(handler)
    }

    /// Drop a subscription.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.inner.registry.unsubscribe(subscription);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────

    fn start_heartbeat(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.heartbeat.lock().replace(token.clone()) {
            previous.cancel();
        }
        let socket = self.clone();
        let interval = Duration::from_secs(self.inner.config.heartbeat_interval_secs);
        let _task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // Skip the immediate first tick
            let _ = ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !socket.send_frame(&OutboundFrame::Ping) {
                            debug!("keepalive transmit failed; stopping heartbeat");
                            break;
                        }
                    }
                    () = token.cancelled() => break,
                }
            }
        });
    }

    fn stop_heartbeat(&self) {
        if let Some(token) = self.inner.heartbeat.lock().take() {
            token.cancel();
        }
    }

    fn cancel_reconnect(&self) {
        if let Some(token) = self.inner.reconnect.lock().take() {
            token.cancel();
        }
    }

    fn spawn_reader(&self, epoch: u64, mut events: mpsc::Receiver<WireEvent>) {
        let socket = self.clone();
        let _task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Some(WireEvent::Frame(raw)) => match parse_inbound(&raw) {
                        Ok(event) => socket.inner.registry.emit_message(&event),
                        Err(error) => {
                            warn!(%error, "dropping malformed inbound frame");
                        }
                    },
                    Some(WireEvent::Closed { graceful }) => {
                        socket.handle_close(epoch, graceful);
                        return;
                    }
                    None => {
                        // Transport went away without reporting a close
                        socket.handle_close(epoch, false);
                        return;
                    }
                }
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Close handling and reconnection
    // ─────────────────────────────────────────────────────────────────────

    fn handle_close(&self, epoch: u64, graceful: bool) {
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            // A newer connection (or an explicit disconnect) superseded
            // this transport
            return;
        }
        self.stop_heartbeat();
        *self.inner.commands.lock() = None;
        {
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Disconnected {
                return;
            }
            *state = ConnectionState::Disconnected;
        }
        info!(graceful, "connection closed");
        self.inner.registry.emit_disconnect();

        if !self.inner.intentional_close.load(Ordering::SeqCst) {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&self) {
        let attempt = self.inner.failed_attempts.load(Ordering::SeqCst) + 1;
        if attempt > self.inner.config.max_reconnect_attempts {
            *self.inner.state.lock() = ConnectionState::Error;
            warn!(
                attempts = attempt - 1,
                "reconnect attempts exhausted; waiting for explicit connect"
            );
            return;
        }
        let delay = reconnect_delay(
            attempt,
            self.inner.config.reconnect_base_delay_ms,
            self.inner.config.reconnect_max_delay_ms,
        );
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.reconnect.lock().replace(token.clone()) {
            previous.cancel();
        }
        debug!(attempt, ?delay, "scheduling reconnect");
        let socket = self.clone();
        let _task = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = time::sleep(delay) => socket.attempt_reconnect().await,
            }
        });
    }

    async fn attempt_reconnect(&self) {
        if self.inner.intentional_close.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if *state != ConnectionState::Disconnected {
                // An explicit connect (or disconnect) won the race
                return;
            }
            *state = ConnectionState::Connecting;
        }
        match self.open_transport().await {
            Ok(()) => info!("reconnected"),
            Err(error) => {
                let failures = self.inner.failed_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(%error, failures, "reconnect attempt failed");
                *self.inner.state.lock() = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use crate::transport::TransportLink;

    /// Wire handles for one accepted test connection.
    struct TestLink {
        commands: mpsc::Receiver<WireCommand>,
        events: mpsc::Sender<WireEvent>,
    }

    /// Scripted in-process transport.
    ///
    /// Each `connect` pops the next scripted outcome (`true` = accept);
    /// an empty script falls back to `default_ok`.
    struct TestTransport {
        script: StdMutex<VecDeque<bool>>,
        default_ok: bool,
        connects: AtomicUsize,
        links: StdMutex<VecDeque<TestLink>>,
    }

    impl TestTransport {
        fn new(script: Vec<bool>, default_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script.into()),
                default_ok,
                connects: AtomicUsize::new(0),
                links: StdMutex::new(VecDeque::new()),
            })
        }

        fn always_ok() -> Arc<Self> {
            Self::new(Vec::new(), true)
        }

        fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn take_link(&self) -> TestLink {
            self.links
                .lock()
                .unwrap()
                .pop_front()
                .expect("no accepted connection to take")
        }
    }

    #[async_trait]
    impl Transport for TestTransport {
        async fn connect(&self, _url: &str) -> Result<TransportLink, SyncError> {
            let _ = self.connects.fetch_add(1, Ordering::SeqCst);
            let ok = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.default_ok);
            if !ok {
                return Err(SyncError::Handshake("connection refused".into()));
            }
            let (command_tx, command_rx) = mpsc::channel(32);
            let (event_tx, event_rx) = mpsc::channel(32);
            self.links.lock().unwrap().push_back(TestLink {
                commands: command_rx,
                events: event_tx,
            });
            Ok(TransportLink {
                commands: command_tx,
                events: event_rx,
            })
        }
    }

    fn socket_with(transport: Arc<TestTransport>) -> ChatSocket {
        ChatSocket::new(SyncConfig::new("ws://test.invalid/ws"), transport)
    }

    /// Let spawned tasks make progress without advancing the clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn chat_frame(text: &str, sender: &str) -> String {
        format!(
            r#"{{"type":"chat_message","conversation_id":"conv_1","sender_id":"{sender}","message_text":"{text}","created_at":"2026-08-05T10:00:00Z"}}"#
        )
    }

    // -- connect --

    #[tokio::test]
    async fn connect_transitions_to_connected() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn connect_when_connected_is_noop() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        socket.connect().await.unwrap();
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn connect_failure_sets_error_and_propagates() {
        let transport = TestTransport::new(Vec::new(), false);
        let socket = socket_with(transport.clone());
        let result = socket.connect().await;
        assert!(matches!(result, Err(SyncError::Handshake(_))));
        assert_eq!(socket.state(), ConnectionState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_connect_failure_does_not_auto_retry() {
        let transport = TestTransport::new(Vec::new(), false);
        let socket = socket_with(transport.clone());
        let _ = socket.connect().await;
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(socket.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn connect_after_error_retries() {
        let transport = TestTransport::new(vec![false, true], true);
        let socket = socket_with(transport.clone());
        let _ = socket.connect().await;
        assert_eq!(socket.state(), ConnectionState::Error);
        socket.connect().await.unwrap();
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn subscriber_registered_before_connect_sees_the_event() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport);
        let connects = Arc::new(AtomicUsize::new(0));
        let connects_clone = connects.clone();
        let _sub = socket.on_connect(move || {
            let _ = connects_clone.fetch_add(1, Ordering::SeqCst);
        });
        socket.connect().await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    // -- send --

    #[tokio::test]
    async fn send_before_connect_returns_false() {
        let socket = socket_with(TestTransport::always_ok());
        assert!(!socket.send(&ConversationId::from("conv_1"), "hi", MessageKind::Text));
    }

    #[tokio::test]
    async fn send_serializes_and_transmits() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        assert!(socket.send(&ConversationId::from("conv_1"), "hello", MessageKind::Text));

        let command = link.commands.recv().await.unwrap();
        let WireCommand::Frame(json) = command else {
            panic!("expected frame, got {command:?}");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["conversation_id"], "conv_1");
        assert_eq!(value["message"], "hello");
    }

    #[tokio::test]
    async fn typing_and_mark_read_are_silent_noops_offline() {
        let socket = socket_with(TestTransport::always_ok());
        socket.send_typing(&ConversationId::from("conv_1"));
        socket.mark_read(&MessageId::from("msg_1"));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn typing_frame_reaches_the_wire() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        socket.send_typing(&ConversationId::from("conv_1"));

        let WireCommand::Frame(json) = link.commands.recv().await.unwrap() else {
            panic!("expected frame");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "typing");
    }

    // -- inbound dispatch --

    #[tokio::test]
    async fn inbound_frames_reach_subscribers() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = socket.on_message(move |event| {
            seen_clone.lock().unwrap().push(event.clone());
        });
        socket.connect().await.unwrap();
        let link = transport.take_link();

        link.events
            .send(WireEvent::Frame(chat_frame("hello", "user_2")))
            .await
            .unwrap();
        settle().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], InboundEvent::ChatMessage(_)));
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_without_teardown() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _sub = socket.on_message(move |_| {
            let _ = hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        socket.connect().await.unwrap();
        let link = transport.take_link();

        link.events
            .send(WireEvent::Frame("{broken json".into()))
            .await
            .unwrap();
        link.events
            .send(WireEvent::Frame(r#"{"type":"pong"}"#.into()))
            .await
            .unwrap();
        settle().await;

        // The bad frame was dropped, the good one delivered, and the
        // connection survived
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    // -- disconnect --

    #[tokio::test(start_paused = true)]
    async fn disconnect_suppresses_reconnect() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();

        socket.disconnect();
        assert_eq!(socket.state(), ConnectionState::Disconnected);

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let disconnects = Arc::new(AtomicUsize::new(0));
        let disconnects_clone = disconnects.clone();
        let _sub = socket.on_disconnect(move || {
            let _ = disconnects_clone.fetch_add(1, Ordering::SeqCst);
        });

        socket.disconnect();
        socket.disconnect();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_after_disconnect_returns_false() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        socket.disconnect();
        assert!(!socket.send(&ConversationId::from("conv_1"), "hi", MessageKind::Text));
    }

    #[tokio::test]
    async fn disconnect_sends_normal_close() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        socket.disconnect();

        assert_eq!(link.commands.recv().await, Some(WireCommand::Close));
    }

    // -- reconnection --

    #[tokio::test(start_paused = true)]
    async fn abnormal_close_reconnects() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let link = transport.take_link();

        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(transport.connect_count(), 2);
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_retries_through_failures() {
        // Close, then two refused attempts, then success
        let transport = TestTransport::new(vec![true, false, false], true);
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let link = transport.take_link();

        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        // Delays 1s + 2s + 4s, with headroom
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(transport.connect_count(), 4);
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_exhaustion_reaches_error_and_stops() {
        // One successful connection, every later attempt refused
        let transport = TestTransport::new(vec![true], false);
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let link = transport.take_link();

        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        // Total backoff is 1+2+4+8+16+30*5 = 181 s; give headroom
        time::sleep(Duration::from_secs(400)).await;

        assert_eq!(socket.state(), ConnectionState::Error);
        // Initial success plus ten failed attempts, then nothing
        assert_eq!(transport.connect_count(), 11);

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.connect_count(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_counter_resets_on_success() {
        // First cycle burns two failures; after the recovery the next
        // close must start a fresh cycle with the full budget
        let transport = TestTransport::new(vec![true, false, false], true);
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let link = transport.take_link();
        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(socket.state(), ConnectionState::Connected);

        // Second cycle: close again; the reconnect must fire after the
        // base 1 s delay, not a continued backoff
        let link = transport.take_link();
        let before = transport.connect_count();
        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(transport.connect_count(), before + 1);
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_survive_reconnect() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _sub = socket.on_message(move |_| {
            let _ = hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        socket.connect().await.unwrap();
        let link = transport.take_link();
        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        time::sleep(Duration::from_secs(2)).await;

        // Deliver through the second connection
        let link = transport.take_link();
        link.events
            .send(WireEvent::Frame(chat_frame("back again", "user_2")))
            .await
            .unwrap();
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    // -- heartbeat --

    #[tokio::test(start_paused = true)]
    async fn heartbeat_sends_ping_on_interval() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        time::sleep(Duration::from_secs(31)).await;

        let WireCommand::Frame(json) = link.commands.try_recv().unwrap() else {
            panic!("expected ping frame");
        };
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn no_heartbeat_before_the_interval() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        time::sleep(Duration::from_secs(10)).await;
        assert!(link.commands.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_then_connect_runs_a_single_heartbeat() {
        let transport = TestTransport::always_ok();
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let _first = transport.take_link();

        socket.disconnect();
        socket.connect().await.unwrap();
        let mut second = transport.take_link();

        time::sleep(Duration::from_secs(31)).await;

        // Exactly one ping on the live link — the first heartbeat was
        // cancelled with its connection
        let mut pings = 0;
        while let Ok(command) = second.commands.try_recv() {
            if matches!(&command, WireCommand::Frame(json) if json.contains("ping")) {
                pings += 1;
            }
        }
        assert_eq!(pings, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_stops_after_close() {
        let transport = TestTransport::new(vec![true], false);
        let socket = socket_with(transport.clone());
        socket.connect().await.unwrap();
        let mut link = transport.take_link();

        link.events
            .send(WireEvent::Closed { graceful: false })
            .await
            .unwrap();
        settle().await;
        // Drain anything already queued, then ensure silence
        while link.commands.try_recv().is_ok() {}
        time::sleep(Duration::from_secs(90)).await;
        assert!(link.commands.try_recv().is_err());
    }
}
