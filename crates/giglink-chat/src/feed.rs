//! Conversation feed state and echo reconciliation.
//!
//! ## Echo matching
//!
//! An inbound `chat_message` may be the server's broadcast of a message
//! this session already appended optimistically. Matching runs in two
//! passes:
//!
//! 1. **Correlation ref** — if the frame reflects a `client_ref`, any
//!    resident entry with the same ref is the original; exact match.
//! 2. **Recency heuristic** — for frames from the local sender without a
//!    usable ref: a resident entry that is `is_mine`, has identical text,
//!    and sits within 5 seconds of the frame timestamp is treated as the
//!    original. Two genuinely distinct identical texts inside the window
//!    would collapse under this pass alone; the correlation ref exists to
//!    make that case exact when the gateway cooperates.
//!
//! A matched echo is discarded — the optimistic entry keeps standing in
//! for it — so the list never shows a message twice.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use giglink_core::constants::DEDUP_WINDOW_MS;
use giglink_core::events::{ChatMessagePayload, InboundEvent};
use giglink_core::ids::{ConversationId, MessageId, UserId};
use giglink_core::message::{ChatMessage, Conversation, LocalIdentity, MessageKind};

// ─────────────────────────────────────────────────────────────────────────────
// Effects
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of ingesting one inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestEffect {
    /// A new message was appended to a conversation.
    Appended(ChatMessage),

    /// The event confirmed a resident optimistic entry; the echo was
    /// discarded.
    Confirmed {
        /// Conversation holding the confirmed entry.
        conversation_id: ConversationId,
        /// ID of the resident entry the echo matched.
        message_id: MessageId,
    },

    /// A transient notification with no message-list mutation.
    Transient(TransientUpdate),

    /// Nothing for the feed to do (heartbeat pong).
    Ignored,
}

/// Transient events forwarded to the UI without persistent state.
#[derive(Clone, Debug, PartialEq)]
pub enum TransientUpdate {
    /// Another participant is typing.
    Typing {
        /// Conversation being typed in.
        conversation_id: ConversationId,
        /// Typing user, when known.
        sender_id: Option<UserId>,
    },
    /// Presence change.
    UserStatus {
        /// User whose presence changed.
        user_id: UserId,
        /// New status string.
        status: String,
    },
    /// A message of ours was read by its recipient.
    ReadReceipt {
        /// Message that was read.
        message_id: MessageId,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Single source of truth for conversation message lists and summaries.
///
/// Interior-mutable and shareable: the connection manager's message
/// subscription and UI readers hold the same `Arc<ChatFeed>`.
pub struct ChatFeed {
    identity: LocalIdentity,
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl ChatFeed {
    /// Create an empty feed for the given session identity.
    #[must_use]
    pub fn new(identity: LocalIdentity) -> Self {
        Self {
            identity,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// The identity this feed computes `is_mine` against.
    #[must_use]
    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Append an optimistic message for a local send.
    ///
    /// The entry is visible immediately — before any network
    /// confirmation — and the conversation summary is updated in the same
    /// step. Returns the synthesized message (its `client_ref` goes out
    /// with the wire frame).
    pub fn append_optimistic(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        kind: MessageKind,
    ) -> ChatMessage {
        let message =
            ChatMessage::optimistic(conversation_id.clone(), text, kind, &self.identity);
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| Conversation::new(conversation_id.clone()));
        insert_ordered(conversation, message.clone());
        message
    }

    /// Merge one inbound event into the feed.
    pub fn ingest(&self, event: &InboundEvent) -> IngestEffect {
        match event {
            InboundEvent::ChatMessage(payload) => self.ingest_chat_message(payload),
            InboundEvent::Typing {
                conversation_id,
                sender_id,
            } => IngestEffect::Transient(TransientUpdate::Typing {
                conversation_id: conversation_id.clone(),
                sender_id: sender_id.clone(),
            }),
            InboundEvent::UserStatus { user_id, status } => {
                IngestEffect::Transient(TransientUpdate::UserStatus {
                    user_id: user_id.clone(),
                    status: status.clone(),
                })
            }
            InboundEvent::MarkRead { message_id, .. } => {
                IngestEffect::Transient(TransientUpdate::ReadReceipt {
                    message_id: message_id.clone(),
                })
            }
            InboundEvent::Pong => IngestEffect::Ignored,
        }
    }

    fn ingest_chat_message(&self, payload: &ChatMessagePayload) -> IngestEffect {
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .entry(payload.conversation_id.clone())
            .or_insert_with(|| Conversation::new(payload.conversation_id.clone()));

        if let Some(resident) = find_echo_original(conversation, payload, &self.identity.user_id) {
            debug!(
                conversation_id = %payload.conversation_id,
                message_id = %resident,
                "discarding echo of optimistic send"
            );
            return IngestEffect::Confirmed {
                conversation_id: payload.conversation_id.clone(),
                message_id: resident,
            };
        }

        let message = ChatMessage::from_event(payload, &self.identity.user_id);
        insert_ordered(conversation, message.clone());
        IngestEffect::Appended(message)
    }

    /// Zero a conversation's unread badge and mark its foreign messages
    /// read (the UI calls this when the thread is opened).
    pub fn mark_read_local(&self, conversation_id: &ConversationId) {
        let mut conversations = self.conversations.write();
        if let Some(conversation) = conversations.get_mut(conversation_id) {
            conversation.unread_count = 0;
            for message in &mut conversation.messages {
                if !message.is_mine {
                    message.is_read = true;
                }
            }
        }
    }

    /// Replace feed state from collaborator-provided data (REST result or
    /// cache snapshot).
    pub fn load_conversations(&self, conversations: Vec<Conversation>) {
        let mut guard = self.conversations.write();
        guard.clear();
        for conversation in conversations {
            let _ = guard.insert(conversation.id.clone(), conversation);
        }
    }

    /// Current conversations, most recently active first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Conversation> {
        let guard = self.conversations.read();
        let mut conversations: Vec<Conversation> = guard.values().cloned().collect();
        conversations.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        conversations
    }

    /// A single conversation by ID.
    #[must_use]
    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<Conversation> {
        self.conversations.read().get(conversation_id).cloned()
    }

    /// A conversation's ordered messages (empty when unknown).
    #[must_use]
    pub fn messages(&self, conversation_id: &ConversationId) -> Vec<ChatMessage> {
        self.conversations
            .read()
            .get(conversation_id)
            .map(|conversation| conversation.messages.clone())
            .unwrap_or_default()
    }

    /// Sum of unread counts across all conversations.
    #[must_use]
    pub fn unread_total(&self) -> u32 {
        self.conversations
            .read()
            .values()
            .map(|conversation| conversation.unread_count)
            .sum()
    }

    /// Number of conversations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    /// Returns `true` if the feed holds no conversations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Merge helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Find the resident optimistic entry an arriving frame is an echo of.
fn find_echo_original(
    conversation: &Conversation,
    payload: &ChatMessagePayload,
    local_user: &UserId,
) -> Option<MessageId> {
    // Exact pass: the gateway reflected our correlation ref
    if let Some(client_ref) = payload.client_ref.as_deref() {
        if let Some(resident) = conversation
            .messages
            .iter()
            .find(|message| message.client_ref.as_deref() == Some(client_ref))
        {
            return Some(resident.id.clone());
        }
    }

    // Heuristic pass: our own sender, identical text, within the window
    if &payload.sender_id == local_user {
        if let Some(resident) = conversation.messages.iter().find(|message| {
            message.is_mine
                && message.text == payload.message_text
                && within_dedup_window(message.created_at, payload.created_at)
        }) {
            return Some(resident.id.clone());
        }
    }

    None
}

fn within_dedup_window(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() <= DEDUP_WINDOW_MS
}

/// Insert a message keeping `created_at` non-decreasing, then refresh the
/// conversation summary.
///
/// Stable: the new entry lands after every resident entry with an equal
/// or earlier timestamp, so resident entries never reorder on ingest.
fn insert_ordered(conversation: &mut Conversation, message: ChatMessage) {
    let unread = !message.is_mine && !message.is_read;
    let index = conversation
        .messages
        .partition_point(|resident| resident.created_at <= message.created_at);
    conversation.messages.insert(index, message);

    if let Some(latest) = conversation.messages.last() {
        conversation.last_message_text = Some(latest.text.clone());
        conversation.last_message_time = Some(latest.created_at);
    }
    if unread {
        conversation.unread_count += 1;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
