//! Canonical CBOR encoding of the SDS message envelope.
//!
//! Messages are encoded as a CBOR map with small integer keys, following
//! RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Optional fields are omitted rather than encoded as null. The decoder
//! ignores keys it does not know, so newer senders can add fields.

use ciborium::value::{Integer, Value};

use crate::error::CoreError;
use crate::message::{Message, MessageHeader, MessageKind};
use crate::types::{ChannelId, HistoryEntry, MessageId, SenderId};

/// Envelope field keys.
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const MESSAGE_ID: u64 = 0;
    pub const CHANNEL_ID: u64 = 1;
    pub const SENDER_ID: u64 = 2;
    pub const LAMPORT_TIMESTAMP: u64 = 3;
    pub const CAUSAL_HISTORY: u64 = 4;
    pub const BLOOM_FILTER: u64 = 5;
    pub const CONTENT: u64 = 6;
    pub const REPAIR_REQUEST: u64 = 7;
}

/// History entry field keys.
mod entry_keys {
    pub const MESSAGE_ID: u64 = 0;
    pub const RETRIEVAL_HINT: u64 = 1;
    pub const SENDER_ID: u64 = 2;
}

/// Encode a message to canonical CBOR bytes.
///
/// The local retrieval hint of the message itself is not part of the wire
/// format. Hints inside history entries are.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let value = message_to_cbor_value(message);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

/// Decode a message from CBOR bytes and classify it.
pub fn decode_message(bytes: &[u8]) -> Result<Message, CoreError> {
    let mut rest = bytes;
    let value: Value =
        ciborium::from_reader(&mut rest).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CoreError::DecodingError(format!(
            "{} trailing bytes after message",
            rest.len()
        )));
    }
    cbor_value_to_message(&value)
}

fn key(k: u64) -> Value {
    Value::Integer(k.into())
}

fn message_to_cbor_value(message: &Message) -> Value {
    let header = &message.header;
    let mut entries = Vec::with_capacity(8);

    entries.push((
        key(keys::MESSAGE_ID),
        Value::Text(header.message_id.as_str().to_owned()),
    ));
    entries.push((
        key(keys::CHANNEL_ID),
        Value::Text(header.channel_id.as_str().to_owned()),
    ));
    entries.push((
        key(keys::SENDER_ID),
        Value::Text(header.sender_id.as_str().to_owned()),
    ));

    if let Some(ts) = message.lamport_timestamp() {
        entries.push((key(keys::LAMPORT_TIMESTAMP), Value::Integer(ts.into())));
    }

    entries.push((
        key(keys::CAUSAL_HISTORY),
        Value::Array(header.causal_history.iter().map(entry_to_cbor_value).collect()),
    ));

    if let Some(filter) = &header.bloom_filter {
        entries.push((key(keys::BLOOM_FILTER), Value::Bytes(filter.to_vec())));
    }

    if let MessageKind::Content { content, .. } | MessageKind::Ephemeral { content } =
        message.kind()
    {
        entries.push((key(keys::CONTENT), Value::Bytes(content.to_vec())));
    }

    if !header.repair_request.is_empty() {
        entries.push((
            key(keys::REPAIR_REQUEST),
            Value::Array(header.repair_request.iter().map(entry_to_cbor_value).collect()),
        ));
    }

    Value::Map(entries)
}

fn entry_to_cbor_value(entry: &HistoryEntry) -> Value {
    let mut entries = Vec::with_capacity(3);
    entries.push((
        key(entry_keys::MESSAGE_ID),
        Value::Text(entry.message_id.as_str().to_owned()),
    ));
    if let Some(hint) = &entry.retrieval_hint {
        entries.push((key(entry_keys::RETRIEVAL_HINT), Value::Bytes(hint.to_vec())));
    }
    if let Some(sender) = &entry.sender_id {
        entries.push((
            key(entry_keys::SENDER_ID),
            Value::Text(sender.as_str().to_owned()),
        ));
    }
    Value::Map(entries)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => panic!("unsupported CBOR value type in envelope"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5), keys sorted by encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Integer-keyed view over a decoded CBOR map.
struct Fields<'a>(&'a [(Value, Value)]);

impl<'a> Fields<'a> {
    fn from_value(value: &'a Value, what: &str) -> Result<Self, CoreError> {
        match value {
            Value::Map(m) => Ok(Self(m)),
            _ => Err(CoreError::MalformedMessage(format!("{} is not a map", what))),
        }
    }

    fn get(&self, k: u64) -> Option<&'a Value> {
        self.0
            .iter()
            .find(|(key, _)| matches!(key, Value::Integer(i) if u64::try_from(*i).ok() == Some(k)))
            .map(|(_, v)| v)
    }

    fn text(&self, k: u64, name: &str) -> Result<Option<String>, CoreError> {
        match self.get(k) {
            Some(Value::Text(s)) => Ok(Some(s.clone())),
            None => Ok(None),
            _ => Err(CoreError::MalformedMessage(format!("invalid {}", name))),
        }
    }

    fn required_text(&self, k: u64, name: &str) -> Result<String, CoreError> {
        self.text(k, name)?
            .ok_or_else(|| CoreError::MalformedMessage(format!("missing {}", name)))
    }

    fn bytes(&self, k: u64, name: &str) -> Result<Option<Vec<u8>>, CoreError> {
        match self.get(k) {
            Some(Value::Bytes(b)) => Ok(Some(b.clone())),
            None => Ok(None),
            _ => Err(CoreError::MalformedMessage(format!("invalid {}", name))),
        }
    }

    fn uint(&self, k: u64, name: &str) -> Result<Option<u64>, CoreError> {
        match self.get(k) {
            Some(Value::Integer(i)) => u64::try_from(*i)
                .map(Some)
                .map_err(|_| CoreError::MalformedMessage(format!("invalid {}", name))),
            None => Ok(None),
            _ => Err(CoreError::MalformedMessage(format!("invalid {}", name))),
        }
    }

    fn entries(&self, k: u64, name: &str) -> Result<Vec<HistoryEntry>, CoreError> {
        match self.get(k) {
            Some(Value::Array(arr)) => arr.iter().map(cbor_value_to_entry).collect(),
            None => Ok(Vec::new()),
            _ => Err(CoreError::MalformedMessage(format!("invalid {}", name))),
        }
    }
}

fn cbor_value_to_entry(value: &Value) -> Result<HistoryEntry, CoreError> {
    let fields = Fields::from_value(value, "history entry")?;
    Ok(HistoryEntry {
        message_id: MessageId::new(
            fields.required_text(entry_keys::MESSAGE_ID, "history entry message id")?,
        ),
        retrieval_hint: fields
            .bytes(entry_keys::RETRIEVAL_HINT, "retrieval hint")?
            .map(Into::into),
        sender_id: fields
            .text(entry_keys::SENDER_ID, "history entry sender id")?
            .map(SenderId::new),
    })
}

fn cbor_value_to_message(value: &Value) -> Result<Message, CoreError> {
    let fields = Fields::from_value(value, "message")?;

    let header = MessageHeader {
        message_id: MessageId::new(fields.required_text(keys::MESSAGE_ID, "message id")?),
        channel_id: ChannelId::new(fields.required_text(keys::CHANNEL_ID, "channel id")?),
        sender_id: SenderId::new(fields.required_text(keys::SENDER_ID, "sender id")?),
        causal_history: fields.entries(keys::CAUSAL_HISTORY, "causal history")?,
        bloom_filter: fields
            .bytes(keys::BLOOM_FILTER, "bloom filter")?
            .map(Into::into),
        repair_request: fields.entries(keys::REPAIR_REQUEST, "repair request")?,
    };

    let lamport_timestamp = fields.uint(keys::LAMPORT_TIMESTAMP, "lamport timestamp")?;
    let content = fields.bytes(keys::CONTENT, "content")?.map(Into::into);

    Message::from_parts(header, lamport_timestamp, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn header(id: &str) -> MessageHeader {
        MessageHeader::new(id, "chat", "alice")
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 1 << 32);
        assert_eq!(buf, vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (key(7), Value::Integer(70.into())),
            (key(0), Value::Integer(0.into())),
            (key(3), Value::Integer(3.into())),
        ];
        encode_map_canonical(&mut buf, &entries);
        assert_eq!(buf, vec![0xa3, 0x00, 0x00, 0x03, 0x03, 0x07, 0x18, 70]);
    }

    #[test]
    fn test_sync_message_bytes() {
        let msg = Message::sync(MessageHeader::new("m", "c", "s"), 1);
        assert_eq!(
            msg.encode(),
            vec![
                0xa5, // map(5)
                0x00, 0x61, b'm', //
                0x01, 0x61, b'c', //
                0x02, 0x61, b's', //
                0x03, 0x01, // lamport 1
                0x04, 0x80, // empty causal history
            ]
        );
    }

    #[test]
    fn test_content_roundtrip() {
        let mut h = header("m1");
        h.causal_history = vec![
            HistoryEntry::new("dep1").with_sender("bob"),
            HistoryEntry::new("dep2").with_retrieval_hint(vec![0xaa, 0xbb]),
        ];
        h.bloom_filter = Some(Bytes::from_static(&[1, 2, 3, 4]));
        h.repair_request = vec![HistoryEntry::new("lost").with_sender("carol")];
        let msg = Message::content(h, 5, vec![1u8, 2, 3]).unwrap();

        let decoded = Message::try_decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.lamport_timestamp(), Some(5));
        assert_eq!(decoded.payload().map(|c| c.to_vec()), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_sync_roundtrip() {
        let msg = Message::sync(header("s1"), 9);
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert!(decoded.is_sync());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_ephemeral_roundtrip() {
        let msg = Message::ephemeral(header("e1"), b"typing".to_vec()).unwrap();
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert!(decoded.is_ephemeral());
        assert_eq!(decoded.lamport_timestamp(), None);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_retrieval_hint_not_encoded() {
        let plain = Message::content(header("m"), 1, b"x".to_vec()).unwrap();
        let hinted = plain.clone().with_retrieval_hint(vec![7u8; 32]);
        assert_eq!(plain.encode(), hinted.encode());
        assert_eq!(Message::decode(&hinted.encode()).unwrap().retrieval_hint(), None);
    }

    #[test]
    fn test_empty_repair_request_omitted() {
        let msg = Message::sync(header("s"), 1);
        let value = message_to_cbor_value(&msg);
        let fields = Fields::from_value(&value, "message").unwrap();
        assert!(fields.get(keys::REPAIR_REQUEST).is_none());
        assert!(fields.get(keys::CONTENT).is_none());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let msg = Message::sync(MessageHeader::new("m", "c", "s"), 1);
        let mut bytes = msg.encode();
        // Bump the map length and append key 20 => 0.
        bytes[0] = 0xa6;
        bytes.extend_from_slice(&[0x14, 0x00]);
        assert_eq!(Message::try_decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_malformed_input() {
        assert!(Message::decode(&[0xff, 0x00, 0x13]).is_none());
        assert!(matches!(
            Message::try_decode(&[0x01]),
            Err(CoreError::MalformedMessage(_))
        ));
        assert!(matches!(
            Message::try_decode(&[]),
            Err(CoreError::DecodingError(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let msg = Message::sync(MessageHeader::new("m", "c", "s"), 1);
        let mut bytes = msg.encode();
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            Message::try_decode(&bytes),
            Err(CoreError::DecodingError(_))
        ));
        assert!(Message::decode(&bytes).is_none());

        // Two concatenated messages are not one message either.
        let doubled = [msg.encode(), msg.encode()].concat();
        assert!(Message::decode(&doubled).is_none());
    }

    #[test]
    fn test_unclassifiable_envelope() {
        // {0: "m", 1: "c", 2: "s"}: no timestamp, no content.
        let bytes = [0xa3, 0x00, 0x61, b'm', 0x01, 0x61, b'c', 0x02, 0x61, b's'];
        assert!(matches!(
            Message::try_decode(&bytes),
            Err(CoreError::Unclassifiable)
        ));
        assert!(Message::decode(&bytes).is_none());
    }

    #[test]
    fn test_missing_sender_rejected() {
        // {0: "m", 1: "c", 3: 1}
        let bytes = [0xa3, 0x00, 0x61, b'm', 0x01, 0x61, b'c', 0x03, 0x01];
        assert!(matches!(
            Message::try_decode(&bytes),
            Err(CoreError::MalformedMessage(_))
        ));
    }
}
