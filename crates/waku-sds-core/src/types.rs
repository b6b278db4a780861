//! Strong type definitions for SDS identifiers.
//!
//! Identifiers travel on the wire as strings, so the newtypes wrap `String`
//! rather than fixed-size byte arrays. They exist to keep message, channel
//! and participant ids from being mixed up at compile time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the underlying string.
            pub fn into_string(self) -> String {
                self.0
            }

            /// Whether the id is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque, content-derived message identifier.
    MessageId
);

string_id!(
    /// Identifier of an SDS channel.
    ChannelId
);

string_id!(
    /// Stable identifier of a channel participant.
    ParticipantId
);

/// The sender of a message is just another participant.
pub type SenderId = ParticipantId;

impl MessageId {
    /// Derive the id of a message from its payload: lowercase hex SHA-256.
    pub fn from_payload(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        Self(hex::encode(digest))
    }
}

impl ParticipantId {
    /// Generate a random participant id (64 hex characters).
    pub fn random() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().gen();
        Self(hex::encode(bytes))
    }
}

/// An entry in a causal history or a repair request.
///
/// `retrieval_hint` is transport-specific (e.g. a store hash) and is carried
/// on the wire. `sender_id` identifies the original author of the referenced
/// message; repair responders need it to compute timing and grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Id of the referenced message.
    pub message_id: MessageId,
    /// Optional hint for fetching the message out of band.
    pub retrieval_hint: Option<Bytes>,
    /// Original sender of the referenced message.
    pub sender_id: Option<SenderId>,
}

/// Entries scheduled by the repair subsystem are plain history entries.
pub type RepairHistoryEntry = HistoryEntry;

impl HistoryEntry {
    /// Entry carrying only a message id.
    pub fn new(message_id: impl Into<MessageId>) -> Self {
        Self {
            message_id: message_id.into(),
            retrieval_hint: None,
            sender_id: None,
        }
    }

    /// Attach a retrieval hint.
    pub fn with_retrieval_hint(mut self, hint: impl Into<Bytes>) -> Self {
        self.retrieval_hint = Some(hint.into());
        self
    }

    /// Attach the original sender.
    pub fn with_sender(mut self, sender_id: impl Into<SenderId>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_message_id_from_payload() {
        // SHA-256("abc")
        let id = MessageId::from_payload(b"abc");
        assert_eq!(
            id.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_random_participant_ids_differ() {
        let a = ParticipantId::random();
        let b = ParticipantId::random();
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(MessageId::from("msg1"), 1);
        assert_eq!(map.get("msg1"), Some(&1));
    }

    #[test]
    fn test_id_debug() {
        let id = ChannelId::from("chat");
        assert_eq!(format!("{:?}", id), "ChannelId(chat)");
        assert_eq!(format!("{}", id), "chat");
    }

    #[test]
    fn test_history_entry_builder() {
        let entry = HistoryEntry::new("msg1")
            .with_retrieval_hint(vec![1u8, 2, 3])
            .with_sender("alice");
        assert_eq!(entry.message_id.as_str(), "msg1");
        assert_eq!(entry.retrieval_hint.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(entry.sender_id, Some(ParticipantId::from("alice")));
    }
}
