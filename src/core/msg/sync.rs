use serde::{Deserialize, Serialize};

use crate::domain::marker::ReadMarker;
use crate::domain::message::{Message, MessagePage, OptimisticId};

/// Messages produced by the pub/sub feed, the history loader, and the
/// read-state collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMsg {
    /// A "message added" event was pushed for this conversation.
    MessageInserted(Message),
    /// A "message updated" event (edit, reaction change) was pushed.
    MessageUpdated(Message),
    /// A local send was started; the payload is the optimistic entry.
    MessageSendStarted(Message),
    /// A local send failed; the optimistic entry stays visible as failed.
    MessageSendFailed { optimistic_id: OptimisticId },
    /// A backward-pagination fetch completed.
    HistoryLoaded(MessagePage),
    /// A backward-pagination fetch failed; retryable, never "no more pages".
    HistoryLoadFailed { reason: String },
    /// The member explicitly marked the conversation read.
    MarkRead,
    /// The read-state collaborator returned the current marker.
    MarkerUpdated(ReadMarker),
}

impl SyncMsg {
    /// Whether this message arrives often enough to be noise in debug logs.
    pub fn is_frequent(&self) -> bool {
        false
    }
}
