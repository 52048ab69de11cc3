use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::domain::marker::ReadMarker;
use crate::domain::message::{ConversationId, MemberId, MessageId};

/// Request to advance a member's read marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRead {
    pub member: MemberId,
    pub conversation: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Errors from the read-state endpoint. A rejected (non-advancing) commit
/// is NOT an error: the collaborator returns the stored marker unchanged
/// and the caller treats that as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    Transport { reason: String },
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { reason } => write!(f, "transport failure: {reason}"),
        }
    }
}

impl std::error::Error for CommitError {}

/// Read-state commit collaborator. Idempotent under the monotonic rule:
/// commits that would move the marker backward (or sideways) are no-ops
/// returning the current marker.
pub trait ReadStateCommitter: Send + Sync {
    fn commit_read(&self, request: CommitRead) -> BoxFuture<'static, Result<ReadMarker, CommitError>>;
}

/// In-process committer keeping markers per (member, conversation). Used by
/// the integration tests and as the reference for the monotonic rule.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadState {
    markers: Arc<Mutex<HashMap<(MemberId, ConversationId), ReadMarker>>>,
}

impl InMemoryReadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current marker, if one was ever committed.
    pub fn marker(&self, member: &MemberId, conversation: &ConversationId) -> Option<ReadMarker> {
        self.markers
            .lock()
            .ok()?
            .get(&(member.clone(), conversation.clone()))
            .cloned()
    }
}

impl ReadStateCommitter for InMemoryReadState {
    fn commit_read(&self, request: CommitRead) -> BoxFuture<'static, Result<ReadMarker, CommitError>> {
        let markers = Arc::clone(&self.markers);
        async move {
            let mut markers = markers.lock().map_err(|e| CommitError::Transport {
                reason: e.to_string(),
            })?;
            let key = (request.member.clone(), request.conversation.clone());
            let current = markers
                .entry(key)
                .or_insert_with(|| ReadMarker::unread(request.member, request.conversation));
            *current = current.advanced(request.last_message_id, request.last_read_at);
            Ok(current.clone())
        }
        .boxed()
    }
}
