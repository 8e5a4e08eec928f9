//! Session-root composition of socket, feed, and cache.
//!
//! The connection service is not a module-level global: the application
//! root constructs one [`ChatSession`] per authenticated session and ties
//! [`ChatSession::start`] / [`ChatSession::stop`] to login/logout. Every
//! screen that needs chat events shares the same instance.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use giglink_cache::{CacheExt, CacheStore};
use giglink_chat::ChatFeed;
use giglink_core::events::OutboundFrame;
use giglink_core::ids::ConversationId;
use giglink_core::message::{ChatMessage, Conversation, LocalIdentity, MessageKind};

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::registry::Subscription;
use crate::socket::ChatSocket;
use crate::transport::Transport;

/// Cache key holding the conversation snapshot.
pub const CONVERSATIONS_CACHE_KEY: &str = "chat.conversations";
/// Cache key holding the session endpoint URL.
pub const ENDPOINT_CACHE_KEY: &str = "session.endpoint";

/// How long a persisted conversation snapshot stays paintable.
const SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One authenticated session's realtime chat engine.
///
/// Composes the connection manager, the reconciliation feed, and the
/// bootstrap cache. On [`start`](ChatSession::start) the feed is seeded
/// from the cached snapshot so a freshly launched client paints a
/// non-empty screen before the first network round-trip resolves; on
/// [`stop`](ChatSession::stop) the snapshot is written back with a TTL.
pub struct ChatSession {
    socket: ChatSocket,
    feed: Arc<ChatFeed>,
    cache: Arc<dyn CacheStore>,
    feed_subscription: Mutex<Option<Subscription>>,
}

impl ChatSession {
    /// Assemble a session from its collaborators.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        identity: LocalIdentity,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            socket: ChatSocket::new(config, transport),
            feed: Arc::new(ChatFeed::new(identity)),
            cache,
            feed_subscription: Mutex::new(None),
        }
    }

    /// The connection manager.
    #[must_use]
    pub fn socket(&self) -> &ChatSocket {
        &self.socket
    }

    /// The reconciliation feed.
    #[must_use]
    pub fn feed(&self) -> &Arc<ChatFeed> {
        &self.feed
    }

    /// Bring the session online: seed the feed from the cached snapshot,
    /// wire it into the socket's fan-out, and connect.
    pub async fn start(&self) -> Result<(), SyncError> {
        if let Some(conversations) = self.cache.get::<Vec<Conversation>>(CONVERSATIONS_CACHE_KEY) {
            debug!(
                count = conversations.len(),
                "seeding feed from cached snapshot"
            );
            self.feed.load_conversations(conversations);
        }
        self.cache
            .set(ENDPOINT_CACHE_KEY, &self.socket.config().url, None);

        let feed = self.feed.clone();
        let subscription = self.socket.on_message(move |event| {
            let _ = feed.ingest(event);
        });
        if let Some(previous) = self.feed_subscription.lock().replace(subscription) {
            self.socket.unsubscribe(previous);
        }

        self.socket.connect().await
    }

    /// Take the session offline and persist the conversation snapshot.
    pub fn stop(&self) {
        self.socket.disconnect();
        if let Some(subscription) = self.feed_subscription.lock().take() {
            self.socket.unsubscribe(subscription);
        }
        self.cache.set(
            CONVERSATIONS_CACHE_KEY,
            &self.feed.snapshot(),
            Some(SNAPSHOT_TTL),
        );
    }

    /// Send a chat message: optimistic append first, then transmission.
    ///
    /// The returned flag reports whether the frame was handed to the
    /// wire. Either way the message stays in the feed — once accepted it
    /// is never silently discarded; retrying an undelivered send is the
    /// caller's decision.
    pub fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        kind: MessageKind,
    ) -> (ChatMessage, bool) {
        let message = self.feed.append_optimistic(conversation_id, text, kind);
        let frame = OutboundFrame::message(
            conversation_id.clone(),
            text.to_owned(),
            kind,
            message.client_ref.clone(),
        );
        let delivered = self.socket.send_frame(&frame);
        if !delivered {
            debug!(
                conversation_id = %conversation_id,
                "send while offline; message kept locally"
            );
        }
        (message, delivered)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
