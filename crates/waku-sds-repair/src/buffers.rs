//! Repair buffers: bounded, time-ordered queues of scheduled repairs.
//!
//! [`OutgoingRepairBuffer`] holds the requests this participant intends to
//! broadcast, keyed by `t_req`. [`IncomingRepairBuffer`] holds the responses
//! it intends to rebroadcast, keyed by `t_resp`. Both hold at most one entry
//! per message id and keep the first schedule they were given.

use std::cmp::Ordering;

use waku_sds_core::{Comparator, MessageId, RepairHistoryEntry, SortedContainer};

/// A repair request scheduled for `t_req` (ms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingBufferEntry {
    pub entry: RepairHistoryEntry,
    pub t_req: u64,
}

/// A repair response scheduled for `t_resp` (ms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingBufferEntry {
    pub entry: RepairHistoryEntry,
    pub t_resp: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ByRequestTime;

impl Comparator<OutgoingBufferEntry> for ByRequestTime {
    fn compare(&self, a: &OutgoingBufferEntry, b: &OutgoingBufferEntry) -> Ordering {
        a.t_req.cmp(&b.t_req)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ByResponseTime;

impl Comparator<IncomingBufferEntry> for ByResponseTime {
    fn compare(&self, a: &IncomingBufferEntry, b: &IncomingBufferEntry) -> Ordering {
        a.t_resp.cmp(&b.t_resp)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outgoing
// ─────────────────────────────────────────────────────────────────────────────

/// Pending repair requests, soonest first.
#[derive(Debug, Clone)]
pub struct OutgoingRepairBuffer {
    items: SortedContainer<OutgoingBufferEntry, ByRequestTime>,
    max_size: usize,
}

impl OutgoingRepairBuffer {
    /// Create a buffer holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: SortedContainer::new(),
            max_size,
        }
    }

    /// Schedule a request for `entry` at `t_req`.
    ///
    /// Returns `false` if the message is already scheduled (the existing
    /// `t_req` is kept) or if the buffer has zero capacity. When full, the
    /// entry with the smallest `t_req` is evicted to make room.
    pub fn add(&mut self, entry: RepairHistoryEntry, t_req: u64) -> bool {
        if self.max_size == 0 {
            tracing::debug!("outgoing repair buffer has no capacity, dropping {}", entry.message_id);
            return false;
        }
        if self.has(&entry.message_id) {
            return false;
        }
        if self.items.len() >= self.max_size {
            if let Some(evicted) = self.items.shift() {
                tracing::warn!(
                    "outgoing repair buffer full, evicting {} (t_req={})",
                    evicted.entry.message_id,
                    evicted.t_req
                );
            }
        }
        self.items.push(OutgoingBufferEntry { entry, t_req })
    }

    /// Drop the request for `message_id`. Returns whether one was present.
    pub fn remove(&mut self, message_id: &MessageId) -> bool {
        let before = self.items.len();
        self.items.retain(|e| &e.entry.message_id != message_id);
        self.items.len() != before
    }

    /// Up to `max_requests` entries due at `now`, soonest first.
    ///
    /// Entries are left in place; they stay eligible until removed.
    pub fn get_eligible(&self, now: u64, max_requests: usize) -> Vec<RepairHistoryEntry> {
        self.items
            .iter()
            .take_while(|e| e.t_req <= now)
            .take(max_requests)
            .map(|e| e.entry.clone())
            .collect()
    }

    /// Whether a request for `message_id` is scheduled.
    pub fn has(&self, message_id: &MessageId) -> bool {
        self.items.iter().any(|e| &e.entry.message_id == message_id)
    }

    /// Scheduled `t_req` for `message_id`.
    pub fn t_req(&self, message_id: &MessageId) -> Option<u64> {
        self.items
            .find(|e| &e.entry.message_id == message_id)
            .map(|e| e.t_req)
    }

    /// Earliest scheduled `t_req`.
    pub fn next_time(&self) -> Option<u64> {
        self.items.first().map(|e| e.t_req)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Scheduled entries, soonest first.
    pub fn entries(&self) -> &[OutgoingBufferEntry] {
        self.items.as_slice()
    }

    /// History entries in schedule order.
    pub fn items(&self) -> Vec<RepairHistoryEntry> {
        self.items.iter().map(|e| e.entry.clone()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Incoming
// ─────────────────────────────────────────────────────────────────────────────

/// Pending repair responses, soonest first.
#[derive(Debug, Clone)]
pub struct IncomingRepairBuffer {
    items: SortedContainer<IncomingBufferEntry, ByResponseTime>,
    max_size: usize,
}

impl IncomingRepairBuffer {
    /// Create a buffer holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: SortedContainer::new(),
            max_size,
        }
    }

    /// Schedule a response for `entry` at `t_resp`.
    ///
    /// Duplicates are ignored. The entry is inserted first and the buffer is
    /// then trimmed back to capacity by evicting the largest `t_resp`. A
    /// newcomer due later than everything already held is therefore the one
    /// evicted: a full buffer keeps the responses due soonest and does not
    /// always admit new entries. Returns whether `entry` is in the buffer
    /// afterwards.
    pub fn add(&mut self, entry: RepairHistoryEntry, t_resp: u64) -> bool {
        if self.max_size == 0 {
            tracing::debug!("incoming repair buffer has no capacity, dropping {}", entry.message_id);
            return false;
        }
        if self.has(&entry.message_id) {
            return false;
        }
        let message_id = entry.message_id.clone();
        self.items.push(IncomingBufferEntry { entry, t_resp });
        if self.items.len() > self.max_size {
            if let Some(evicted) = self.items.pop() {
                tracing::warn!(
                    "incoming repair buffer full, evicting {} (t_resp={})",
                    evicted.entry.message_id,
                    evicted.t_resp
                );
                return evicted.entry.message_id != message_id;
            }
        }
        true
    }

    /// Drop the response for `message_id`. Returns whether one was present.
    pub fn remove(&mut self, message_id: &MessageId) -> bool {
        let before = self.items.len();
        self.items.retain(|e| &e.entry.message_id != message_id);
        self.items.len() != before
    }

    /// Remove and return every entry due at `now`, soonest first.
    pub fn get_ready(&mut self, now: u64) -> Vec<RepairHistoryEntry> {
        let due = self
            .items
            .position(|e| e.t_resp > now)
            .unwrap_or(self.items.len());
        self.items
            .drain(..due)
            .into_iter()
            .map(|e| e.entry)
            .collect()
    }

    /// Whether a response for `message_id` is scheduled.
    pub fn has(&self, message_id: &MessageId) -> bool {
        self.items.iter().any(|e| &e.entry.message_id == message_id)
    }

    /// Scheduled `t_resp` for `message_id`.
    pub fn t_resp(&self, message_id: &MessageId) -> Option<u64> {
        self.items
            .find(|e| &e.entry.message_id == message_id)
            .map(|e| e.t_resp)
    }

    /// Earliest scheduled `t_resp`.
    pub fn next_time(&self) -> Option<u64> {
        self.items.first().map(|e| e.t_resp)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Scheduled entries, soonest first.
    pub fn entries(&self) -> &[IncomingBufferEntry] {
        self.items.as_slice()
    }

    /// History entries in schedule order.
    pub fn items(&self) -> Vec<RepairHistoryEntry> {
        self.items.iter().map(|e| e.entry.clone()).collect()
    }
}
