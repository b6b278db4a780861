//! In-memory history and storage.
//!
//! [`MemLocalHistory`] is the participant's causally ordered log of content
//! messages. [`MemoryHistoryStorage`] is a `HashMap`-backed
//! [`HistoryStorage`] for tests and for embedders with nowhere to persist.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use waku_sds_core::{ByLamportTimestamp, HistoryEntry, Message, MessageId, SortedContainer};

use crate::error::{HistoryError, Result};
use crate::traits::{HistoryStorage, LocalHistory};

/// Content messages ordered by (lamport timestamp, message id).
#[derive(Debug, Clone, Default)]
pub struct MemLocalHistory {
    messages: SortedContainer<Message, ByLamportTimestamp>,
}

impl MemLocalHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a content message.
    ///
    /// Returns `Ok(false)` if a message with the same id is already present,
    /// whatever its local retrieval hint.
    pub fn push(&mut self, message: Message) -> Result<bool> {
        if !message.is_content() {
            return Err(HistoryError::NotContent(message.message_id().clone()));
        }
        if self.contains(message.message_id()) {
            return Ok(false);
        }
        Ok(self.messages.push(message))
    }

    /// Add several content messages. Returns the new length.
    ///
    /// Nothing is added if any message is not a content message. Ids
    /// already held, or repeated within `messages`, keep their first copy.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) -> Result<usize> {
        let messages: Vec<Message> = messages.into_iter().collect();
        if let Some(bad) = messages.iter().find(|m| !m.is_content()) {
            return Err(HistoryError::NotContent(bad.message_id().clone()));
        }
        let mut fresh: Vec<Message> = Vec::with_capacity(messages.len());
        for message in messages {
            let seen = self.contains(message.message_id())
                || fresh.iter().any(|m| m.message_id() == message.message_id());
            if !seen {
                fresh.push(message);
            }
        }
        Ok(self.messages.extend(fresh))
    }

    /// Number of messages held.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message at `index` in causal order.
    pub fn at(&self, index: usize) -> Option<&Message> {
        self.messages.at(index)
    }

    /// Most recent message.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The last `n` messages as history entries, oldest first.
    ///
    /// This is what an outgoing message carries as its causal history.
    pub fn recent_entries(&self, n: usize) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(n);
        self.messages
            .slice(start..)
            .iter()
            .map(Message::to_history_entry)
            .collect()
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl LocalHistory for MemLocalHistory {
    fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.find(|m| m.message_id() == id)
    }
}

/// `HashMap`-backed storage. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryHistoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryHistoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStorage for MemoryHistoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}
