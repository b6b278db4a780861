//! Repair manager: decides when to ask for missing messages and when to
//! answer other participants' requests.
//!
//! Timing is derived from deterministic hashes so that participants who see
//! the same gap at the same moment spread their requests (and responses)
//! over the configured window instead of all broadcasting at once.
//!
//! The manager owns no clock and no timers. Every time-dependent operation
//! has an `_at` variant taking `now` in milliseconds; the plain variant reads
//! the wall clock.

use waku_sds_core::{Blake3IdHasher, IdHasher, Message, MessageId, ParticipantId, RepairHistoryEntry, SenderId};
use waku_sds_history::LocalHistory;

use crate::buffers::{IncomingRepairBuffer, OutgoingRepairBuffer};
use crate::config::{RepairConfig, PARTICIPANTS_PER_RESPONSE_GROUP};
use crate::error::{RepairError, Result};
use crate::events::{RepairEvent, RepairEventHandler};

/// Default cap on requests returned by one outgoing sweep.
pub const DEFAULT_MAX_REPAIR_REQUESTS: usize = 3;

/// Snapshot of repair activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Requests currently scheduled.
    pub pending_requests: usize,
    /// Responses currently scheduled.
    pub pending_responses: usize,
    /// Requests added to the outgoing buffer since creation.
    pub requests_queued: u64,
    /// Responses added to the incoming buffer since creation.
    pub responses_queued: u64,
    /// Messages handed back for rebroadcast.
    pub responses_sent: u64,
    /// Due responses whose message was no longer held.
    pub responses_unavailable: u64,
}

/// SDS-R repair state for one participant in one channel.
pub struct RepairManager<H = Blake3IdHasher> {
    participant_id: ParticipantId,
    config: RepairConfig,
    outgoing: OutgoingRepairBuffer,
    incoming: IncomingRepairBuffer,
    hasher: H,
    on_event: Option<RepairEventHandler>,
    stats: RepairStats,
}

impl RepairManager<Blake3IdHasher> {
    /// Create a manager using the default hasher.
    pub fn new(participant_id: impl Into<ParticipantId>, config: RepairConfig) -> Result<Self> {
        Self::with_hasher(participant_id, config, Blake3IdHasher)
    }
}

impl<H: IdHasher> RepairManager<H> {
    /// Create a manager with a custom hasher.
    ///
    /// Every participant of a channel must use the same hasher.
    pub fn with_hasher(
        participant_id: impl Into<ParticipantId>,
        config: RepairConfig,
        hasher: H,
    ) -> Result<Self> {
        let participant_id = participant_id.into();
        if participant_id.is_empty() {
            return Err(RepairError::EmptyParticipantId);
        }
        config.validate()?;

        tracing::info!("repair manager initialized for participant {}", participant_id);
        Ok(Self {
            outgoing: OutgoingRepairBuffer::new(config.buffer_size),
            incoming: IncomingRepairBuffer::new(config.buffer_size),
            participant_id,
            config,
            hasher,
            on_event: None,
            stats: RepairStats::default(),
        })
    }

    /// Deliver [`RepairEvent`]s to `handler`.
    pub fn with_event_handler(
        mut self,
        handler: impl Fn(&RepairEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(handler));
        self
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timing and grouping
    // ─────────────────────────────────────────────────────────────────────────

    /// When to request `message_id`: `now + t_min + hash(self, msg) mod (t_max - t_min)`.
    pub fn calculate_t_req(&self, message_id: &MessageId, now: u64) -> u64 {
        let t_min = self.config.t_min_millis();
        let range = self.config.t_max_millis().saturating_sub(t_min).max(1);
        let hash = self
            .hasher
            .combined_hash(self.participant_id.as_str(), message_id.as_str());
        now.saturating_add(hash % range + t_min)
    }

    /// When to answer a request: `now + (distance * hash(msg)) mod t_max`,
    /// where `distance` is the XOR of the two participants' hashes.
    ///
    /// The product is taken at 128 bits so it never wraps.
    pub fn calculate_t_resp(&self, sender_id: &SenderId, message_id: &MessageId, now: u64) -> u64 {
        let t_max = u128::from(self.config.t_max_millis().max(1));
        let distance = self.hasher.hash_str(self.participant_id.as_str())
            ^ self.hasher.hash_str(sender_id.as_str());
        let message_hash = self.hasher.hash_str(message_id.as_str());
        let offset = (u128::from(distance) * u128::from(message_hash)) % t_max;
        // offset < t_max <= u64::MAX
        now.saturating_add(offset as u64)
    }

    /// Whether this participant should answer requests for `message_id`
    /// originally sent by `sender_id`.
    pub fn is_in_response_group(&self, sender_id: &SenderId, message_id: &MessageId) -> bool {
        if sender_id.is_empty() {
            return false;
        }
        let groups = self.config.effective_response_groups();
        if groups <= 1 {
            return true;
        }
        let own = self
            .hasher
            .combined_hash(self.participant_id.as_str(), message_id.as_str())
            % groups;
        let sender = self
            .hasher
            .combined_hash(sender_id.as_str(), message_id.as_str())
            % groups;
        own == sender
    }

    /// Recompute the response group count for a channel of `num_participants`.
    pub fn update_response_groups(&mut self, num_participants: u64) {
        self.config.num_response_groups =
            (num_participants / PARTICIPANTS_PER_RESPONSE_GROUP).max(1);
        tracing::info!(
            "updated response groups to {} for {} participants",
            self.config.num_response_groups,
            num_participants
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inputs
    // ─────────────────────────────────────────────────────────────────────────

    /// Schedule requests for causal dependencies found missing.
    pub fn on_missing_dependencies(&mut self, missing: &[RepairHistoryEntry]) {
        self.on_missing_dependencies_at(missing, now_millis());
    }

    /// [`on_missing_dependencies`](Self::on_missing_dependencies) at an explicit time.
    pub fn on_missing_dependencies_at(&mut self, missing: &[RepairHistoryEntry], now: u64) {
        if !self.config.enabled {
            return;
        }
        for entry in missing {
            let t_req = self.calculate_t_req(&entry.message_id, now);
            if self.outgoing.add(entry.clone(), t_req) {
                tracing::info!(
                    "added missing dependency {} to repair buffer with t_req={}",
                    entry.message_id,
                    t_req
                );
                self.stats.requests_queued += 1;
                self.emit(RepairEvent::RequestQueued {
                    message_id: entry.message_id.clone(),
                    t_req,
                });
            }
        }
    }

    /// A message arrived; neither ask for it nor answer for it any more.
    pub fn on_message_received(&mut self, message_id: &MessageId) {
        if !self.config.enabled {
            return;
        }
        if self.outgoing.remove(message_id) {
            tracing::info!("removed {} from outgoing repair buffer after receipt", message_id);
        }
        if self.incoming.remove(message_id) {
            tracing::info!("removed {} from incoming repair buffer after receipt", message_id);
        }
    }

    /// Handle repair requests observed on the wire.
    pub fn process_incoming_repair_requests<L>(&mut self, requests: &[RepairHistoryEntry], history: &L)
    where
        L: LocalHistory + ?Sized,
    {
        self.process_incoming_repair_requests_at(requests, history, now_millis());
    }

    /// [`process_incoming_repair_requests`](Self::process_incoming_repair_requests)
    /// at an explicit time.
    pub fn process_incoming_repair_requests_at<L>(
        &mut self,
        requests: &[RepairHistoryEntry],
        history: &L,
        now: u64,
    ) where
        L: LocalHistory + ?Sized,
    {
        if !self.config.enabled {
            return;
        }
        for request in requests {
            // Someone else already asked.
            self.outgoing.remove(&request.message_id);

            if !history.contains(&request.message_id) {
                tracing::info!(
                    "cannot fulfill repair for {}: not in local history",
                    request.message_id
                );
                continue;
            }

            let Some(sender_id) = request.sender_id.as_ref() else {
                tracing::warn!(
                    "cannot determine response group for {}: missing sender id",
                    request.message_id
                );
                continue;
            };

            if !self.is_in_response_group(sender_id, &request.message_id) {
                tracing::debug!("not in response group for {}", request.message_id);
                continue;
            }

            let t_resp = self.calculate_t_resp(sender_id, &request.message_id, now);
            if self.incoming.add(request.clone(), t_resp) {
                tracing::info!(
                    "will respond to repair request for {} at t_resp={}",
                    request.message_id,
                    t_resp
                );
                self.stats.responses_queued += 1;
                self.emit(RepairEvent::ResponseQueued {
                    message_id: request.message_id.clone(),
                    t_resp,
                });
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sweeps
    // ─────────────────────────────────────────────────────────────────────────

    /// Requests due now, at most `max_requests`.
    pub fn sweep_outgoing_buffer(&self, max_requests: usize) -> Vec<RepairHistoryEntry> {
        self.sweep_outgoing_buffer_at(max_requests, now_millis())
    }

    /// [`sweep_outgoing_buffer`](Self::sweep_outgoing_buffer) at an explicit time.
    pub fn sweep_outgoing_buffer_at(&self, max_requests: usize, now: u64) -> Vec<RepairHistoryEntry> {
        if !self.config.enabled {
            return Vec::new();
        }
        self.outgoing.get_eligible(now, max_requests)
    }

    /// Messages due for rebroadcast now.
    pub fn sweep_incoming_buffer<L>(&mut self, history: &L) -> Vec<Message>
    where
        L: LocalHistory + ?Sized,
    {
        self.sweep_incoming_buffer_at(history, now_millis())
    }

    /// [`sweep_incoming_buffer`](Self::sweep_incoming_buffer) at an explicit time.
    pub fn sweep_incoming_buffer_at<L>(&mut self, history: &L, now: u64) -> Vec<Message>
    where
        L: LocalHistory + ?Sized,
    {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut messages = Vec::new();
        for entry in self.incoming.get_ready(now) {
            match history.get(&entry.message_id) {
                Some(message) => {
                    tracing::info!("sending repair for {}", entry.message_id);
                    self.stats.responses_sent += 1;
                    messages.push(message.clone());
                }
                None => {
                    tracing::warn!("message {} no longer in local history", entry.message_id);
                    self.stats.responses_unavailable += 1;
                }
            }
        }
        messages
    }

    /// Drop every scheduled request and response.
    pub fn clear(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn has_pending_requests(&self) -> bool {
        !self.outgoing.is_empty()
    }

    pub fn pending_request_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn pending_response_count(&self) -> usize {
        self.incoming.len()
    }

    /// Earliest scheduled request time.
    pub fn next_request_time(&self) -> Option<u64> {
        self.outgoing.next_time()
    }

    /// Earliest scheduled response time.
    pub fn next_response_time(&self) -> Option<u64> {
        self.incoming.next_time()
    }

    pub fn is_pending_request(&self, message_id: &MessageId) -> bool {
        self.outgoing.has(message_id)
    }

    pub fn is_pending_response(&self, message_id: &MessageId) -> bool {
        self.incoming.has(message_id)
    }

    pub fn outgoing_buffer(&self) -> &OutgoingRepairBuffer {
        &self.outgoing
    }

    pub fn incoming_buffer(&self) -> &IncomingRepairBuffer {
        &self.incoming
    }

    pub fn stats(&self) -> RepairStats {
        RepairStats {
            pending_requests: self.outgoing.len(),
            pending_responses: self.incoming.len(),
            ..self.stats.clone()
        }
    }

    fn emit(&self, event: RepairEvent) {
        if let Some(handler) = &self.on_event {
            handler(&event);
        }
    }
}

/// Current wall-clock time in milliseconds. A clock before the epoch reads as 0.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
