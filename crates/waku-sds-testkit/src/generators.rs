//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use waku_sds_core::{HistoryEntry, Message, MessageBuilder, MessageId, ParticipantId};

/// Generate a hex message id.
pub fn message_id() -> impl Strategy<Value = MessageId> {
    "[0-9a-f]{8,64}".prop_map(MessageId::from)
}

/// Generate a participant id.
pub fn participant_id() -> impl Strategy<Value = ParticipantId> {
    "[a-z][a-z0-9]{0,15}".prop_map(ParticipantId::from)
}

/// Generate a channel name.
pub fn channel_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate non-empty payload bytes of at most `max_len` bytes.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// Generate a history entry with optional hint and sender.
pub fn history_entry() -> impl Strategy<Value = HistoryEntry> {
    (
        message_id(),
        prop::option::of(prop::collection::vec(any::<u8>(), 1..33)),
        prop::option::of(participant_id()),
    )
        .prop_map(|(message_id, hint, sender)| HistoryEntry {
            message_id,
            retrieval_hint: hint.map(Bytes::from),
            sender_id: sender,
        })
}

/// Which shape of message to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Content,
    Sync,
    Ephemeral,
}

/// Parameters for generating a message.
#[derive(Debug, Clone)]
pub struct MessageParams {
    pub shape: Shape,
    pub message_id: MessageId,
    pub channel: String,
    pub sender: ParticipantId,
    pub lamport_timestamp: u64,
    pub payload: Vec<u8>,
    pub causal_history: Vec<HistoryEntry>,
    pub bloom_filter: Option<Vec<u8>>,
    pub repair_request: Vec<HistoryEntry>,
}

impl Arbitrary for MessageParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop_oneof![Just(Shape::Content), Just(Shape::Sync), Just(Shape::Ephemeral)],
            message_id(),
            channel_name(),
            participant_id(),
            any::<u64>(),
            payload(256),
            prop::collection::vec(history_entry(), 0..4),
            prop::option::of(prop::collection::vec(any::<u8>(), 1..64)),
            prop::collection::vec(history_entry(), 0..3),
        )
            .prop_map(
                |(
                    shape,
                    message_id,
                    channel,
                    sender,
                    lamport_timestamp,
                    payload,
                    causal_history,
                    bloom_filter,
                    repair_request,
                )| MessageParams {
                    shape,
                    message_id,
                    channel,
                    sender,
                    lamport_timestamp,
                    payload,
                    causal_history,
                    bloom_filter,
                    repair_request,
                },
            )
            .boxed()
    }
}

/// Build the message described by `params`.
///
/// Payloads are generated non-empty, so every shape is constructible.
pub fn message_from_params(params: &MessageParams) -> Message {
    let mut builder = MessageBuilder::new(
        params.message_id.clone(),
        params.channel.as_str(),
        params.sender.clone(),
    )
    .causal_history(params.causal_history.clone())
    .repair_request(params.repair_request.clone());

    if let Some(filter) = &params.bloom_filter {
        builder = builder.bloom_filter(filter.clone());
    }
    builder = match params.shape {
        Shape::Content => builder
            .lamport_timestamp(params.lamport_timestamp)
            .content(params.payload.clone()),
        Shape::Sync => builder.lamport_timestamp(params.lamport_timestamp),
        Shape::Ephemeral => builder.content(params.payload.clone()),
    };

    match builder.build() {
        Ok(message) => message,
        Err(e) => panic!("generated params must form a valid message: {}", e),
    }
}

/// Generate an arbitrary valid message.
pub fn message() -> impl Strategy<Value = Message> {
    any::<MessageParams>().prop_map(|p| message_from_params(&p))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_encoding_round_trips(msg in message()) {
            let decoded = Message::try_decode(&msg.encode()).unwrap();
            prop_assert_eq!(decoded, msg);
        }

        #[test]
        fn prop_shape_preserved(params: MessageParams) {
            let msg = message_from_params(&params);
            match params.shape {
                Shape::Content => prop_assert!(msg.is_content()),
                Shape::Sync => prop_assert!(msg.is_sync()),
                Shape::Ephemeral => prop_assert!(msg.is_ephemeral()),
            }
        }
    }
}
