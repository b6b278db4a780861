//! Test fixtures and helpers.
//!
//! [`Participant`] wires a history, a bloom filter and a repair manager
//! together the way a channel would, without causal buffering or transport.
//! It is enough to drive multi-participant repair scenarios in tests.

use waku_sds_core::{
    BloomFilter, ChannelId, HistoryEntry, Message, MessageBuilder, MessageHeader, MessageId,
    ParticipantId, DEFAULT_BLOOM_FILTER_OPTIONS,
};
use waku_sds_history::{LocalHistory, MemLocalHistory};
use waku_sds_repair::{RepairConfig, RepairManager, DEFAULT_MAX_REPAIR_REQUESTS};

/// Number of recent messages attached as causal history.
pub const DEFAULT_CAUSAL_HISTORY_SIZE: usize = 200;

/// What a participant wants to put on the wire after a tick.
#[derive(Debug, Default)]
pub struct Outbox {
    /// Repair requests now due.
    pub requests: Vec<HistoryEntry>,
    /// Messages to rebroadcast in answer to peers' requests.
    pub responses: Vec<Message>,
}

/// One member of a simulated channel.
pub struct Participant {
    pub id: ParticipantId,
    pub channel: ChannelId,
    pub history: MemLocalHistory,
    pub repair: RepairManager,
    pub filter: BloomFilter,
    pub causal_history_size: usize,
    lamport: u64,
}

impl Participant {
    /// Create a participant with an empty history.
    pub fn new(
        id: impl Into<ParticipantId>,
        channel: impl Into<ChannelId>,
        config: RepairConfig,
    ) -> anyhow::Result<Self> {
        let id = id.into();
        Ok(Self {
            repair: RepairManager::new(id.clone(), config)?,
            filter: BloomFilter::new(DEFAULT_BLOOM_FILTER_OPTIONS)?,
            id,
            channel: channel.into(),
            history: MemLocalHistory::new(),
            causal_history_size: DEFAULT_CAUSAL_HISTORY_SIZE,
            lamport: 0,
        })
    }

    /// Current lamport clock.
    pub fn lamport(&self) -> u64 {
        self.lamport
    }

    /// Author a content message, recording it locally.
    ///
    /// Repair requests due at `now` are piggy-backed on the message.
    pub fn send(&mut self, payload: &[u8], now: u64) -> anyhow::Result<Message> {
        self.lamport += 1;

        let mut preimage = self.id.as_str().as_bytes().to_vec();
        preimage.extend_from_slice(&self.lamport.to_be_bytes());
        preimage.extend_from_slice(payload);

        let message = MessageBuilder::new(
            MessageId::from_payload(&preimage),
            self.channel.clone(),
            self.id.clone(),
        )
        .lamport_timestamp(self.lamport)
        .content(payload.to_vec())
        .causal_history(self.history.recent_entries(self.causal_history_size))
        .bloom_filter(self.filter.to_bytes())
        .repair_request(
            self.repair
                .sweep_outgoing_buffer_at(DEFAULT_MAX_REPAIR_REQUESTS, now),
        )
        .build()?;

        self.history.push(message.clone())?;
        self.filter.insert(message.message_id().as_str());
        Ok(message)
    }

    /// Handle a message from the wire. Returns the dependencies found missing.
    pub fn receive(&mut self, message: &Message, now: u64) -> anyhow::Result<Vec<HistoryEntry>> {
        if message.channel_id() != &self.channel || message.sender_id() == &self.id {
            return Ok(Vec::new());
        }

        if !message.header.repair_request.is_empty() {
            self.repair.process_incoming_repair_requests_at(
                &message.header.repair_request,
                &self.history,
                now,
            );
        }

        let Some(ts) = message.lamport_timestamp() else {
            return Ok(Vec::new());
        };
        self.lamport = self.lamport.max(ts);

        let missing: Vec<HistoryEntry> = message
            .header
            .causal_history
            .iter()
            .filter(|e| !self.history.contains(&e.message_id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::debug!(
                "{} missing {} dependencies of {}",
                self.id,
                missing.len(),
                message.message_id()
            );
            self.repair.on_missing_dependencies_at(&missing, now);
        }

        if message.is_content() && !self.history.contains(message.message_id()) {
            self.history.push(message.clone())?;
            self.filter.insert(message.message_id().as_str());
        }
        self.repair.on_message_received(message.message_id());
        Ok(missing)
    }

    /// Sweep both repair buffers at `now`.
    pub fn tick(&mut self, now: u64) -> Outbox {
        Outbox {
            responses: self.repair.sweep_incoming_buffer_at(&self.history, now),
            requests: self
                .repair
                .sweep_outgoing_buffer_at(DEFAULT_MAX_REPAIR_REQUESTS, now),
        }
    }

    /// Build a sync message carrying a repair request.
    pub fn repair_request_message(&self, requests: Vec<HistoryEntry>) -> Message {
        let mut header = MessageHeader::new(
            MessageId::from_payload(format!("{}:sync:{}", self.id, self.lamport).as_bytes()),
            self.channel.clone(),
            self.id.clone(),
        );
        header.causal_history = self.history.recent_entries(self.causal_history_size);
        header.repair_request = requests;
        Message::sync(header, self.lamport)
    }

    /// Whether this participant holds `message_id`.
    pub fn has(&self, message_id: &MessageId) -> bool {
        self.history.contains(message_id)
    }
}

/// Create participants named `p0..pN` sharing one channel.
pub fn multi_party_fixtures(
    count: usize,
    channel: &str,
    config: RepairConfig,
) -> anyhow::Result<Vec<Participant>> {
    (0..count)
        .map(|i| Participant::new(format!("p{}", i), channel, config.clone()))
        .collect()
}
