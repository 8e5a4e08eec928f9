//! Branded ID newtypes for type safety.
//!
//! Every entity in the Giglink engine has a distinct ID type implemented as
//! a newtype wrapper around `String`. This prevents accidentally passing a
//! conversation ID where a message ID is expected.
//!
//! Freshly generated IDs are UUID v7 (time-ordered) via
//! [`uuid::Uuid::now_v7`], so locally synthesized message IDs sort
//! consistently with their creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a conversation thread.
    ConversationId
}

branded_id! {
    /// Unique identifier for a chat message.
    ///
    /// Either client-assigned (optimistic sends) or server-assigned
    /// (inbound frames); the two spaces never collide because both sides
    /// generate UUIDs.
    MessageId
}

branded_id! {
    /// Unique identifier for a platform user (client or worker).
    UserId
}

branded_id! {
    /// Unique identifier for the job a conversation is attached to.
    JobId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_new_is_uuid_v7() {
        let id = MessageId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn conversation_id_new_is_uuid_v7() {
        let id = ConversationId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn v7_ids_sort_by_creation_order() {
        let first = MessageId::new();
        let second = MessageId::new();
        assert!(first.as_str() <= second.as_str());
    }

    #[test]
    fn from_string_preserves_value() {
        let id = UserId::from_string("user_42".into());
        assert_eq!(id.as_str(), "user_42");
    }

    #[test]
    fn from_str_ref() {
        let id = JobId::from("job_7");
        assert_eq!(id.as_str(), "job_7");
    }

    #[test]
    fn display_shows_inner_value() {
        let id = ConversationId::from("conv_1");
        assert_eq!(format!("{id}"), "conv_1");
    }

    #[test]
    fn into_inner_round_trips() {
        let id = MessageId::from_string("msg_9".into());
        let s: String = id.into_inner();
        assert_eq!(s, "msg_9");
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::from("user_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user_1\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_types_with_same_value_compare_by_type() {
        let user = UserId::from("x");
        let same = UserId::from("x");
        assert_eq!(user, same);
    }

    #[test]
    fn deref_to_str() {
        let id = ConversationId::from("conv_2");
        assert!(id.starts_with("conv"));
    }
}
