//! Notifications emitted when repairs are scheduled.

use waku_sds_core::MessageId;

/// A repair was added to one of the buffers.
///
/// Emitted only when an entry is actually added; duplicates and entries
/// dropped by a zero-capacity buffer produce no event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairEvent {
    /// A request for a missing message was scheduled.
    RequestQueued { message_id: MessageId, t_req: u64 },
    /// A response to a peer's request was scheduled.
    ResponseQueued { message_id: MessageId, t_resp: u64 },
}

impl RepairEvent {
    /// The message the event concerns.
    pub fn message_id(&self) -> &MessageId {
        match self {
            RepairEvent::RequestQueued { message_id, .. }
            | RepairEvent::ResponseQueued { message_id, .. } => message_id,
        }
    }
}

/// Callback receiving repair events.
pub type RepairEventHandler = Box<dyn Fn(&RepairEvent) + Send + Sync>;
