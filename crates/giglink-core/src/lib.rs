//! # giglink-core
//!
//! Shared vocabulary for the Giglink realtime conversation engine.
//!
//! This crate provides the types the other Giglink crates speak in:
//!
//! - **Branded IDs**: `ConversationId`, `MessageId`, `UserId`, `JobId` as
//!   newtypes for type safety
//! - **Data model**: `ChatMessage`, `Conversation`, `Participant`,
//!   `LocalIdentity`
//! - **Wire frames**: `InboundEvent` tagged union and `OutboundFrame`
//!   builders for the JSON protocol
//! - **Errors**: `WireError` via `thiserror`
//! - **Logging**: `init_subscriber` for the `tracing` stack

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod message;

pub use errors::WireError;
pub use events::{ChatMessagePayload, InboundEvent, OutboundFrame, parse_inbound};
pub use ids::{ConversationId, JobId, MessageId, UserId};
pub use message::{
    ChatMessage, Conversation, JobContext, LocalIdentity, MessageKind, Participant,
};
