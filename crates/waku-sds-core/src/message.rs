//! Message: the unit exchanged on an SDS channel.
//!
//! Every message shares a [`MessageHeader`]. What else it carries is decided
//! by its [`MessageKind`]:
//!
//! - `Content` messages carry a lamport timestamp and a non-empty payload,
//!   and take part in causal ordering.
//! - `Sync` messages carry a lamport timestamp and no payload. They exist to
//!   advertise causal history and bloom filter state.
//! - `Ephemeral` messages carry a payload and no timestamp. They are never
//!   ordered, buffered or repaired.
//!
//! The kind is fixed at construction and cannot be changed afterwards, so a
//! `Message` that exists is always well-formed.

use bytes::Bytes;
use std::cmp::Ordering;

use crate::canonical::{decode_message, encode_message};
use crate::error::{CoreError, Result};
use crate::sorted::Comparator;
use crate::types::{ChannelId, HistoryEntry, MessageId, SenderId};

/// Fields common to every message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Content-derived identifier.
    pub message_id: MessageId,
    /// Channel the message belongs to.
    pub channel_id: ChannelId,
    /// Author of the message.
    pub sender_id: SenderId,
    /// Causal dependencies, oldest first.
    pub causal_history: Vec<HistoryEntry>,
    /// Serialized bloom filter of the sender's received ids.
    pub bloom_filter: Option<Bytes>,
    /// Messages the sender is asking others to rebroadcast.
    pub repair_request: Vec<HistoryEntry>,
}

impl MessageHeader {
    /// Header with empty history, no filter and no repair request.
    pub fn new(
        message_id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        sender_id: impl Into<SenderId>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            causal_history: Vec::new(),
            bloom_filter: None,
            repair_request: Vec::new(),
        }
    }
}

/// The kind of a message, determining which optional fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Content { lamport_timestamp: u64, content: Bytes },
    Sync { lamport_timestamp: u64 },
    Ephemeral { content: Bytes },
}

impl MessageKind {
    /// Short lowercase name, used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Content { .. } => "content",
            MessageKind::Sync { .. } => "sync",
            MessageKind::Ephemeral { .. } => "ephemeral",
        }
    }
}

/// A validated SDS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Common fields.
    pub header: MessageHeader,
    kind: MessageKind,
    /// Where this message can be fetched from. Local only; never encoded.
    retrieval_hint: Option<Bytes>,
}

impl Message {
    /// Create a content message. Fails if `content` is empty.
    pub fn content(
        header: MessageHeader,
        lamport_timestamp: u64,
        content: impl Into<Bytes>,
    ) -> Result<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(CoreError::EmptyContent("content"));
        }
        Ok(Self::from_kind(
            header,
            MessageKind::Content {
                lamport_timestamp,
                content,
            },
        ))
    }

    /// Create a sync message.
    pub fn sync(header: MessageHeader, lamport_timestamp: u64) -> Self {
        Self::from_kind(header, MessageKind::Sync { lamport_timestamp })
    }

    /// Create an ephemeral message. Fails if `content` is empty.
    pub fn ephemeral(header: MessageHeader, content: impl Into<Bytes>) -> Result<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(CoreError::EmptyContent("ephemeral"));
        }
        Ok(Self::from_kind(header, MessageKind::Ephemeral { content }))
    }

    /// Classify raw optional fields into a message kind.
    ///
    /// | timestamp | content     | kind          |
    /// |-----------|-------------|---------------|
    /// | present   | non-empty   | Content       |
    /// | present   | absent/empty| Sync          |
    /// | absent    | non-empty   | Ephemeral     |
    /// | absent    | absent/empty| error         |
    pub fn from_parts(
        header: MessageHeader,
        lamport_timestamp: Option<u64>,
        content: Option<Bytes>,
    ) -> Result<Self> {
        let content = content.filter(|c| !c.is_empty());
        let kind = match (lamport_timestamp, content) {
            (Some(lamport_timestamp), Some(content)) => MessageKind::Content {
                lamport_timestamp,
                content,
            },
            (Some(lamport_timestamp), None) => MessageKind::Sync { lamport_timestamp },
            (None, Some(content)) => MessageKind::Ephemeral { content },
            (None, None) => return Err(CoreError::Unclassifiable),
        };
        Ok(Self::from_kind(header, kind))
    }

    fn from_kind(header: MessageHeader, kind: MessageKind) -> Self {
        Self {
            header,
            kind,
            retrieval_hint: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// The message kind.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Message id.
    pub fn message_id(&self) -> &MessageId {
        &self.header.message_id
    }

    /// Channel id.
    pub fn channel_id(&self) -> &ChannelId {
        &self.header.channel_id
    }

    /// Sender id.
    pub fn sender_id(&self) -> &SenderId {
        &self.header.sender_id
    }

    /// Lamport timestamp, absent for ephemeral messages.
    pub fn lamport_timestamp(&self) -> Option<u64> {
        match self.kind {
            MessageKind::Content {
                lamport_timestamp, ..
            }
            | MessageKind::Sync { lamport_timestamp } => Some(lamport_timestamp),
            MessageKind::Ephemeral { .. } => None,
        }
    }

    /// Payload, absent for sync messages.
    pub fn payload(&self) -> Option<&Bytes> {
        match &self.kind {
            MessageKind::Content { content, .. } | MessageKind::Ephemeral { content } => {
                Some(content)
            }
            MessageKind::Sync { .. } => None,
        }
    }

    /// Whether this is a content message.
    pub fn is_content(&self) -> bool {
        matches!(self.kind, MessageKind::Content { .. })
    }

    /// Whether this is a sync message.
    pub fn is_sync(&self) -> bool {
        matches!(self.kind, MessageKind::Sync { .. })
    }

    /// Whether this is an ephemeral message.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self.kind, MessageKind::Ephemeral { .. })
    }

    /// Local retrieval hint, if one was attached.
    pub fn retrieval_hint(&self) -> Option<&Bytes> {
        self.retrieval_hint.as_ref()
    }

    /// Attach a local retrieval hint.
    pub fn with_retrieval_hint(mut self, hint: impl Into<Bytes>) -> Self {
        self.retrieval_hint = Some(hint.into());
        self
    }

    /// Set or clear the local retrieval hint.
    pub fn set_retrieval_hint(&mut self, hint: Option<Bytes>) {
        self.retrieval_hint = hint;
    }

    /// Sort key for content messages: zero-padded timestamp, then id.
    ///
    /// Lexicographic order of the keys matches (timestamp, id) order for any
    /// timestamp below 10^16.
    pub fn ordering_key(&self) -> Option<String> {
        match self.kind {
            MessageKind::Content {
                lamport_timestamp, ..
            } => Some(format!(
                "{:016}_{}",
                lamport_timestamp, self.header.message_id
            )),
            _ => None,
        }
    }

    /// Reference to this message for use in another message's causal history.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            message_id: self.header.message_id.clone(),
            retrieval_hint: self.retrieval_hint.clone(),
            sender_id: Some(self.header.sender_id.clone()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wire format
    // ─────────────────────────────────────────────────────────────────────────

    /// Encode to canonical CBOR.
    pub fn encode(&self) -> Vec<u8> {
        encode_message(self)
    }

    /// Decode from CBOR, returning the error on failure.
    pub fn try_decode(bytes: &[u8]) -> Result<Self> {
        decode_message(bytes)
    }

    /// Decode from CBOR. Malformed input is logged and yields `None`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match decode_message(bytes) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!("failed to decode sds message: {}", e);
                None
            }
        }
    }
}

/// Orders messages by (lamport timestamp, message id).
///
/// Ephemeral messages have no timestamp and sort as if it were zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByLamportTimestamp;

impl Comparator<Message> for ByLamportTimestamp {
    fn compare(&self, a: &Message, b: &Message) -> Ordering {
        let ta = a.lamport_timestamp().unwrap_or(0);
        let tb = b.lamport_timestamp().unwrap_or(0);
        ta.cmp(&tb)
            .then_with(|| a.header.message_id.cmp(&b.header.message_id))
    }
}

/// Builder for messages whose kind is decided by the fields supplied.
pub struct MessageBuilder {
    header: MessageHeader,
    lamport_timestamp: Option<u64>,
    content: Option<Bytes>,
    retrieval_hint: Option<Bytes>,
}

impl MessageBuilder {
    /// Start building a message.
    pub fn new(
        message_id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        sender_id: impl Into<SenderId>,
    ) -> Self {
        Self {
            header: MessageHeader::new(message_id, channel_id, sender_id),
            lamport_timestamp: None,
            content: None,
            retrieval_hint: None,
        }
    }

    /// Set the lamport timestamp.
    pub fn lamport_timestamp(mut self, ts: u64) -> Self {
        self.lamport_timestamp = Some(ts);
        self
    }

    /// Set the payload.
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the causal history.
    pub fn causal_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.header.causal_history = history;
        self
    }

    /// Set the serialized bloom filter.
    pub fn bloom_filter(mut self, filter: impl Into<Bytes>) -> Self {
        self.header.bloom_filter = Some(filter.into());
        self
    }

    /// Set the repair request.
    pub fn repair_request(mut self, request: Vec<HistoryEntry>) -> Self {
        self.header.repair_request = request;
        self
    }

    /// Attach a local retrieval hint.
    pub fn retrieval_hint(mut self, hint: impl Into<Bytes>) -> Self {
        self.retrieval_hint = Some(hint.into());
        self
    }

    /// Classify and build the message.
    pub fn build(self) -> Result<Message> {
        let mut message = Message::from_parts(self.header, self.lamport_timestamp, self.content)?;
        message.retrieval_hint = self.retrieval_hint;
        Ok(message)
    }
}
