//! Wire frame types for the persistent connection.
//!
//! Two frame families:
//!
//! - **[`InboundEvent`]**: `type`-discriminated frames arriving from the
//!   server (chat messages, typing indicators, presence, read receipts,
//!   heartbeat pongs). Ephemeral — never persisted, only forwarded to
//!   subscribers.
//! - **[`OutboundFrame`]**: frames the client transmits (sends, typing,
//!   read receipts, heartbeat pings).
//!
//! Frames are JSON text. A frame that fails to parse is a protocol-level
//! error: the connection manager logs and drops it without tearing down
//! the connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::WireError;
use crate::ids::{ConversationId, MessageId, UserId};
use crate::message::MessageKind;

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of an inbound `chat_message` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    /// Server-assigned message ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Sender user ID.
    pub sender_id: UserId,
    /// Sender display name.
    #[serde(default)]
    pub sender_name: String,
    /// Sender avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    /// Message body.
    pub message_text: String,
    /// Message kind (`text` / `image`).
    #[serde(default)]
    pub message_type: MessageKind,
    /// Whether the server already considers the message read.
    #[serde(default)]
    pub is_read: bool,
    /// Server-side creation time. Older gateways emit the field as
    /// `timestamp`; both spellings are accepted.
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Correlation ref reflected from the originating send, when the
    /// gateway supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

/// Frames arriving over the persistent connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A chat message broadcast, possibly the echo of a local send.
    ChatMessage(ChatMessagePayload),

    /// Another participant is typing.
    Typing {
        /// Conversation being typed in.
        conversation_id: ConversationId,
        /// Typing user, when the gateway includes it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<UserId>,
    },

    /// Presence change for a user.
    UserStatus {
        /// User whose presence changed.
        user_id: UserId,
        /// New status string (`online` / `offline`).
        status: String,
    },

    /// A message was read by its recipient.
    MarkRead {
        /// Message that was read.
        message_id: MessageId,
        /// Conversation, when the gateway includes it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<ConversationId>,
    },

    /// Heartbeat reply.
    Pong,
}

/// Parse a raw inbound text frame.
///
/// Unknown `type` discriminants and malformed bodies both surface as
/// [`WireError::Malformed`] — callers log and drop.
pub fn parse_inbound(raw: &str) -> Result<InboundEvent, WireError> {
    serde_json::from_str(raw).map_err(|source| WireError::Malformed { source })
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Frames the client transmits over the persistent connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Text message send.
    Text {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message body.
        message: String,
        /// Correlation ref for echo matching.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },

    /// Image message send (the body carries the image URL).
    Image {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Image URL.
        message: String,
        /// Correlation ref for echo matching.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },

    /// Typing indicator.
    Typing {
        /// Conversation being typed in.
        conversation_id: ConversationId,
    },

    /// Read receipt.
    MarkRead {
        /// Message that was read.
        message_id: MessageId,
    },

    /// Heartbeat keepalive.
    Ping,
}

impl OutboundFrame {
    /// Build a message-send frame for the given kind.
    #[must_use]
    pub fn message(
        conversation_id: ConversationId,
        message: String,
        kind: MessageKind,
        client_ref: Option<String>,
    ) -> Self {
        match kind {
            MessageKind::Text => Self::Text {
                conversation_id,
                message,
                client_ref,
            },
            MessageKind::Image => Self::Image {
                conversation_id,
                message,
                client_ref,
            },
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(|source| WireError::Encode { source })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
