//! Chat message and conversation data model.
//!
//! [`ChatMessage`] is created on one of two paths: optimistically on a
//! local send (client-assigned ID, `is_mine = true`) or from an inbound
//! frame (server ID, `is_mine` computed by sender comparison). Once
//! reconciled into a conversation it is treated as immutable — a duplicate
//! detection may discard an arriving echo in favor of the optimistic
//! entry, but a message is never shown twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::ChatMessagePayload;
use crate::ids::{ConversationId, JobId, MessageId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Message kind
// ─────────────────────────────────────────────────────────────────────────────

/// Payload kind of a chat message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text body.
    #[default]
    Text,
    /// Image reference (the body carries the image URL).
    Image,
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated session identity, handed in by the (excluded)
/// auth/REST layer.
///
/// Used to stamp optimistic sends and to compute `is_mine` on inbound
/// messages. The engine never performs authentication itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Current user ID.
    pub user_id: UserId,
    /// Display name shown on outgoing messages.
    pub display_name: String,
    /// Avatar URL, if the profile has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl LocalIdentity {
    /// Create an identity with no avatar.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            avatar: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat message
// ─────────────────────────────────────────────────────────────────────────────

/// A single chat message inside a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message ID — client-assigned for optimistic sends, server-assigned
    /// for inbound frames.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Sender user ID.
    pub sender_id: UserId,
    /// Sender display name.
    pub sender_name: String,
    /// Sender avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    /// Message body (text, or image URL for [`MessageKind::Image`]).
    pub text: String,
    /// Payload kind.
    pub kind: MessageKind,
    /// Whether the message has been read by the local user.
    pub is_read: bool,
    /// Creation timestamp (client clock for optimistic sends, server
    /// clock for inbound frames).
    pub created_at: DateTime<Utc>,
    /// Whether the local session authored this message.
    pub is_mine: bool,
    /// Client-generated correlation ID, echoed back by the server so an
    /// optimistic entry can be matched exactly against its echo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

impl ChatMessage {
    /// Synthesize an optimistic message for a local send.
    ///
    /// The message carries a fresh client-assigned ID and correlation ref,
    /// `is_mine = true`, and `created_at = now`. It is appended to the
    /// conversation before any network confirmation.
    #[must_use]
    pub fn optimistic(
        conversation_id: ConversationId,
        text: impl Into<String>,
        kind: MessageKind,
        author: &LocalIdentity,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender_id: author.user_id.clone(),
            sender_name: author.display_name.clone(),
            sender_avatar: author.avatar.clone(),
            text: text.into(),
            kind,
            is_read: true,
            created_at: Utc::now(),
            is_mine: true,
            client_ref: Some(Uuid::now_v7().to_string()),
        }
    }

    /// Build a message from an inbound frame payload.
    ///
    /// `is_mine` is computed by comparing the frame's sender to the local
    /// session identity. Frames without a server-assigned ID get a fresh
    /// local one.
    #[must_use]
    pub fn from_event(payload: &ChatMessagePayload, local_user: &UserId) -> Self {
        Self {
            id: payload.id.clone().unwrap_or_default(),
            conversation_id: payload.conversation_id.clone(),
            sender_id: payload.sender_id.clone(),
            sender_name: payload.sender_name.clone(),
            sender_avatar: payload.sender_avatar.clone(),
            text: payload.message_text.clone(),
            kind: payload.message_type,
            is_read: payload.is_read,
            created_at: payload.created_at,
            is_mine: &payload.sender_id == local_user,
            client_ref: payload.client_ref.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

/// A participant in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant user ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// The hiring relationship a conversation is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    /// Job ID.
    pub job_id: JobId,
    /// Job title shown in the thread header.
    pub title: String,
}

/// A conversation thread with its ordered messages and summary state.
///
/// Creation and deletion belong to the job/hiring collaborator; the
/// engine only maintains live message and summary state for the duration
/// of a chat session. `messages` is kept monotonically non-decreasing in
/// `created_at` by the reconciliation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Conversation participants.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Job this conversation rides on, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_context: Option<JobContext>,
    /// Ordered message list (non-decreasing `created_at`).
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Text of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
    /// Timestamp of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
    /// Count of unread messages from other participants.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Create an empty conversation shell for the given ID.
    #[must_use]
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            participants: Vec::new(),
            job_context: None,
            messages: Vec::new(),
            last_message_text: None,
            last_message_time: None,
            unread_count: 0,
        }
    }

    /// Number of messages currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the conversation holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
