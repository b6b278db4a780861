//! History traits: lookup over locally held messages, and the key/value
//! backend persistent history writes through.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use waku_sds_core::{Message, MessageId};

use crate::error::Result;

/// Read access to the messages this participant holds.
///
/// The repair manager only ever needs to answer "do I have this message, and
/// if so what is it", so any map-like container will do.
pub trait LocalHistory {
    /// Look up a message by id.
    fn get(&self, id: &MessageId) -> Option<&Message>;

    /// Whether a message with this id is held.
    fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }
}

impl<S: BuildHasher> LocalHistory for HashMap<MessageId, Message, S> {
    fn get(&self, id: &MessageId) -> Option<&Message> {
        HashMap::get(self, id)
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.contains_key(id)
    }
}

impl<T: LocalHistory + ?Sized> LocalHistory for &T {
    fn get(&self, id: &MessageId) -> Option<&Message> {
        (**self).get(id)
    }
}

/// String key/value storage, in the shape of a browser `localStorage`.
///
/// Methods take `&self`; implementations synchronise internally.
pub trait HistoryStorage {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

impl<S: HistoryStorage + ?Sized> HistoryStorage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}
