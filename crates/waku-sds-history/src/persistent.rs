//! History that survives restarts.
//!
//! [`PersistentHistory`] wraps a [`MemLocalHistory`] and writes its whole
//! contents to a [`HistoryStorage`] after every push, as a JSON array under
//! one key per channel. On open the stored array is read back.
//!
//! Storage is best effort. A failed write is logged and the in-memory
//! history stays authoritative. A stored value that cannot be parsed is
//! deleted so it does not fail every subsequent open.

use std::ops::Deref;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use waku_sds_core::{ChannelId, HistoryEntry, Message, MessageHeader, MessageId, SenderId};

use crate::error::{HistoryError, Result};
use crate::memory::MemLocalHistory;
use crate::traits::{HistoryStorage, LocalHistory};

/// Prefix of the default storage key; the channel id is appended.
pub const HISTORY_STORAGE_PREFIX: &str = "waku:sds:history:";

/// Where a persistent history lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentHistoryOptions {
    pub channel_id: ChannelId,
    /// Overrides the default `waku:sds:history:<channel>` key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
}

impl PersistentHistoryOptions {
    pub fn new(channel_id: impl Into<ChannelId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            storage_key: None,
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    /// The key the history is stored under.
    pub fn resolved_key(&self) -> String {
        self.storage_key
            .clone()
            .unwrap_or_else(|| format!("{}{}", HISTORY_STORAGE_PREFIX, self.channel_id))
    }
}

/// A [`MemLocalHistory`] mirrored into a key/value store.
pub struct PersistentHistory<S> {
    history: MemLocalHistory,
    storage: S,
    storage_key: String,
}

impl<S: HistoryStorage> PersistentHistory<S> {
    /// Open the history for a channel, restoring anything stored.
    pub fn open(storage: S, options: &PersistentHistoryOptions) -> Self {
        let mut this = Self {
            history: MemLocalHistory::new(),
            storage,
            storage_key: options.resolved_key(),
        };
        this.restore();
        this
    }

    /// Add a content message and persist.
    pub fn push(&mut self, message: Message) -> Result<bool> {
        let added = self.history.push(message)?;
        if added {
            self.persist();
        }
        Ok(added)
    }

    /// Add several content messages and persist. Returns the new length.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) -> Result<usize> {
        let len = self.history.extend(messages)?;
        self.persist();
        Ok(len)
    }

    /// The key this history is stored under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&self) {
        let records: Vec<StoredContentMessage> =
            self.history.iter().filter_map(StoredContentMessage::from_message).collect();
        let result = serde_json::to_string(&records)
            .map_err(HistoryError::from)
            .and_then(|json| self.storage.set_item(&self.storage_key, &json));
        if let Err(e) = result {
            tracing::warn!("failed to persist history {}: {}", self.storage_key, e);
        }
    }

    fn restore(&mut self) {
        let raw = match self.storage.get_item(&self.storage_key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("failed to read history {}: {}", self.storage_key, e);
                return;
            }
        };

        let records: Vec<StoredContentMessage> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "discarding unreadable history {}: {}",
                    self.storage_key,
                    e
                );
                if let Err(e) = self.storage.remove_item(&self.storage_key) {
                    tracing::warn!("failed to remove history {}: {}", self.storage_key, e);
                }
                return;
            }
        };

        let total = records.len();
        let messages: Vec<Message> = records
            .into_iter()
            .filter_map(|record| match record.into_message() {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::debug!("skipping stored message: {}", e);
                    None
                }
            })
            .collect();

        let restored = messages.len();
        if let Err(e) = self.history.extend(messages) {
            tracing::warn!("failed to restore history {}: {}", self.storage_key, e);
            return;
        }
        tracing::debug!(
            "restored {} of {} messages from {}",
            restored,
            total,
            self.storage_key
        );
    }
}

impl<S> Deref for PersistentHistory<S> {
    type Target = MemLocalHistory;

    fn deref(&self) -> &MemLocalHistory {
        &self.history
    }
}

impl<S> LocalHistory for PersistentHistory<S> {
    fn get(&self, id: &MessageId) -> Option<&Message> {
        self.history.get(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stored record format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHistoryEntry {
    message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retrieval_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredContentMessage {
    message_id: String,
    channel_id: String,
    sender_id: String,
    /// Decimal string; JSON numbers lose precision above 2^53.
    lamport_timestamp: String,
    causal_history: Vec<StoredHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bloom_filter: Option<String>,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retrieval_hint: Option<String>,
}

fn to_hex(data: Option<&Bytes>) -> Option<String> {
    data.filter(|d| !d.is_empty()).map(hex::encode)
}

fn from_hex(value: Option<&str>) -> Result<Option<Bytes>> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => hex::decode(s)
            .map(|b| Some(Bytes::from(b)))
            .map_err(|e| HistoryError::InvalidData(format!("bad hex: {}", e))),
    }
}

impl StoredHistoryEntry {
    fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            message_id: entry.message_id.to_string(),
            retrieval_hint: to_hex(entry.retrieval_hint.as_ref()),
            sender_id: entry.sender_id.as_ref().map(ToString::to_string),
        }
    }

    fn into_entry(self) -> Result<HistoryEntry> {
        Ok(HistoryEntry {
            message_id: MessageId::new(self.message_id),
            retrieval_hint: from_hex(self.retrieval_hint.as_deref())?,
            sender_id: self.sender_id.map(SenderId::new),
        })
    }
}

impl StoredContentMessage {
    fn from_message(message: &Message) -> Option<Self> {
        let lamport_timestamp = message.lamport_timestamp()?;
        let content = message.payload()?;
        let header = &message.header;
        Some(Self {
            message_id: header.message_id.to_string(),
            channel_id: header.channel_id.to_string(),
            sender_id: header.sender_id.to_string(),
            lamport_timestamp: lamport_timestamp.to_string(),
            causal_history: header
                .causal_history
                .iter()
                .map(StoredHistoryEntry::from_entry)
                .collect(),
            bloom_filter: to_hex(header.bloom_filter.as_ref()),
            content: hex::encode(content),
            retrieval_hint: to_hex(message.retrieval_hint()),
        })
    }

    fn into_message(self) -> Result<Message> {
        let lamport_timestamp: u64 = self.lamport_timestamp.parse().map_err(|_| {
            HistoryError::InvalidData(format!(
                "bad lamport timestamp: {}",
                self.lamport_timestamp
            ))
        })?;
        let content = hex::decode(&self.content)
            .map_err(|e| HistoryError::InvalidData(format!("bad content hex: {}", e)))?;

        let mut header = MessageHeader::new(self.message_id, self.channel_id, self.sender_id);
        header.causal_history = self
            .causal_history
            .into_iter()
            .map(StoredHistoryEntry::into_entry)
            .collect::<Result<_>>()?;
        header.bloom_filter = from_hex(self.bloom_filter.as_deref())?;

        let mut message = Message::content(header, lamport_timestamp, content)
            .map_err(|e| HistoryError::InvalidData(e.to_string()))?;
        message.set_retrieval_hint(from_hex(self.retrieval_hint.as_deref())?);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHistoryStorage;
    use crate::sqlite::SqliteHistoryStorage;
    use std::sync::Arc;

    fn content(id: &str, ts: u64) -> Message {
        let mut header = MessageHeader::new(id, "chat", "alice");
        header.causal_history = vec![HistoryEntry::new("dep")
            .with_retrieval_hint(vec![0xde, 0xad])
            .with_sender("bob")];
        header.bloom_filter = Some(Bytes::from_static(&[1, 2, 3]));
        Message::content(header, ts, b"hello".to_vec())
            .unwrap()
            .with_retrieval_hint(vec![0xbe, 0xef])
    }

    #[test]
    fn test_default_key() {
        let options = PersistentHistoryOptions::new("chat");
        assert_eq!(options.resolved_key(), "waku:sds:history:chat");
        let custom = options.with_storage_key("mine");
        assert_eq!(custom.resolved_key(), "mine");
    }

    #[test]
    fn test_persist_and_restore() {
        let storage = Arc::new(MemoryHistoryStorage::new());
        let options = PersistentHistoryOptions::new("chat");

        let mut history = PersistentHistory::open(storage.clone(), &options);
        history.push(content("m2", 2)).unwrap();
        history.push(content("m1", 1)).unwrap();
        assert!(storage.get_item("waku:sds:history:chat").unwrap().is_some());

        let restored = PersistentHistory::open(storage, &options);
        assert_eq!(restored.len(), 2);
        let first = restored.at(0).unwrap();
        assert_eq!(first, &content("m1", 1));
        assert_eq!(first.retrieval_hint().map(|h| h.to_vec()), Some(vec![0xbe, 0xef]));
    }

    #[test]
    fn test_redelivered_message_not_stored_twice() {
        let storage = Arc::new(MemoryHistoryStorage::new());
        let options = PersistentHistoryOptions::new("chat");

        let mut history = PersistentHistory::open(storage.clone(), &options);
        assert!(history.push(content("m1", 1)).unwrap());
        let again = content("m1", 1).with_retrieval_hint(vec![0x01]);
        assert!(!history.push(again).unwrap());
        assert_eq!(history.len(), 1);

        let restored = PersistentHistory::open(storage, &options);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.recent_entries(10).len(), 1);
    }

    #[test]
    fn test_large_timestamp_survives() {
        let storage = Arc::new(MemoryHistoryStorage::new());
        let options = PersistentHistoryOptions::new("chat");
        let mut history = PersistentHistory::open(storage.clone(), &options);
        history.push(content("big", u64::MAX)).unwrap();

        let raw = storage.get_item("waku:sds:history:chat").unwrap().unwrap();
        assert!(raw.contains("\"lamportTimestamp\":\"18446744073709551615\""));

        let restored = PersistentHistory::open(storage, &options);
        assert_eq!(restored.at(0).unwrap().lamport_timestamp(), Some(u64::MAX));
    }

    #[test]
    fn test_corrupt_data_removed() {
        let storage = Arc::new(MemoryHistoryStorage::new());
        storage.set_item("waku:sds:history:chat", "{not json").unwrap();

        let history = PersistentHistory::open(storage.clone(), &PersistentHistoryOptions::new("chat"));
        assert!(history.is_empty());
        assert_eq!(storage.get_item("waku:sds:history:chat").unwrap(), None);
    }

    #[test]
    fn test_bad_record_skipped() {
        let storage = Arc::new(MemoryHistoryStorage::new());
        let json = r#"[
            {"messageId":"ok","channelId":"chat","senderId":"a","lamportTimestamp":"1","causalHistory":[],"content":"68"},
            {"messageId":"bad","channelId":"chat","senderId":"a","lamportTimestamp":"x","causalHistory":[],"content":"68"},
            {"messageId":"empty","channelId":"chat","senderId":"a","lamportTimestamp":"2","causalHistory":[],"content":""}
        ]"#;
        storage.set_item("waku:sds:history:chat", json).unwrap();

        let history = PersistentHistory::open(storage, &PersistentHistoryOptions::new("chat"));
        assert_eq!(history.len(), 1);
        assert!(history.contains(&MessageId::from("ok")));
    }

    #[test]
    fn test_non_content_rejected() {
        let storage = MemoryHistoryStorage::new();
        let mut history = PersistentHistory::open(storage, &PersistentHistoryOptions::new("chat"));
        let sync = Message::sync(MessageHeader::new("s", "chat", "alice"), 1);
        assert!(matches!(history.push(sync), Err(HistoryError::NotContent(_))));
        assert_eq!(history.storage().get_item(history.storage_key()).unwrap(), None);
    }

    #[test]
    fn test_sqlite_backed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sds.db");
        let options = PersistentHistoryOptions::new("chat");

        {
            let storage = SqliteHistoryStorage::open(&path).unwrap();
            let mut history = PersistentHistory::open(storage, &options);
            history.extend(vec![content("a", 1), content("b", 2)]).unwrap();
        }

        let storage = SqliteHistoryStorage::open(&path).unwrap();
        let history = PersistentHistory::open(storage, &options);
        let ids: Vec<&str> = history.iter().map(|m| m.message_id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
