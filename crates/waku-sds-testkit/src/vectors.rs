//! Golden test vectors for the message envelope.
//!
//! These vectors pin the canonical CBOR encoding so that independent
//! implementations produce identical bytes for the same message.

use bytes::Bytes;
use waku_sds_core::{CoreError, HistoryEntry, Message, MessageBuilder};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub message_id: &'static str,
    pub channel_id: &'static str,
    pub sender_id: &'static str,
    pub lamport_timestamp: Option<u64>,
    pub content: Option<&'static [u8]>,
    pub causal_history: Vec<HistoryEntry>,
    pub bloom_filter: Option<&'static [u8]>,
    pub repair_request: Vec<HistoryEntry>,
    /// Expected encoding (hex).
    pub expected_hex: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "sync message",
            message_id: "m",
            channel_id: "c",
            sender_id: "s",
            lamport_timestamp: Some(1),
            content: None,
            causal_history: Vec::new(),
            bloom_filter: None,
            repair_request: Vec::new(),
            expected_hex: "a500616d01616302617303010480",
        },
        GoldenVector {
            name: "content message",
            message_id: "m1",
            channel_id: "c",
            sender_id: "s",
            lamport_timestamp: Some(5),
            content: Some(&[1, 2, 3]),
            causal_history: Vec::new(),
            bloom_filter: None,
            repair_request: Vec::new(),
            expected_hex: "a600626d31016163026173030504800643010203",
        },
        GoldenVector {
            name: "ephemeral message",
            message_id: "e",
            channel_id: "c",
            sender_id: "s",
            lamport_timestamp: None,
            content: Some(b"hi"),
            causal_history: Vec::new(),
            bloom_filter: None,
            repair_request: Vec::new(),
            expected_hex: "a5006165016163026173048006426869",
        },
        GoldenVector {
            name: "content with history, filter and repair request",
            message_id: "m",
            channel_id: "c",
            sender_id: "s",
            lamport_timestamp: Some(24),
            content: Some(&[0xff]),
            causal_history: vec![HistoryEntry::new("d")
                .with_retrieval_hint(Bytes::from_static(&[0xaa]))
                .with_sender("s")],
            bloom_filter: Some(&[0x01]),
            repair_request: vec![HistoryEntry::new("r")],
            expected_hex: "a800616d0161630261730318180481a30061640141aa0261730541010641ff0781a1006172",
        },
    ]
}

/// Build the message described by a vector.
pub fn message_from_vector(vector: &GoldenVector) -> Result<Message, CoreError> {
    let mut builder = MessageBuilder::new(vector.message_id, vector.channel_id, vector.sender_id)
        .causal_history(vector.causal_history.clone())
        .repair_request(vector.repair_request.clone());
    if let Some(ts) = vector.lamport_timestamp {
        builder = builder.lamport_timestamp(ts);
    }
    if let Some(content) = vector.content {
        builder = builder.content(Bytes::from_static(content));
    }
    if let Some(filter) = vector.bloom_filter {
        builder = builder.bloom_filter(Bytes::from_static(filter));
    }
    builder.build()
}

/// Verify all golden vectors encode and decode as expected.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let message = message_from_vector(&vector)
            .map_err(|e| format!("vector '{}': {}", vector.name, e))?;
        let encoded = hex::encode(message.encode());
        if encoded != vector.expected_hex {
            return Err(format!(
                "vector '{}': expected {}, got {}",
                vector.name, vector.expected_hex, encoded
            ));
        }
        let bytes = hex::decode(vector.expected_hex)
            .map_err(|e| format!("vector '{}': bad hex: {}", vector.name, e))?;
        match Message::decode(&bytes) {
            Some(decoded) if decoded == message => {}
            other => {
                return Err(format!(
                    "vector '{}': decoded to {:?}",
                    vector.name, other
                ))
            }
        }
    }
    Ok(())
}
