use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::message::{ConversationId, MemberId, MessageId};

/// How far a member has read in one conversation.
///
/// `last_read_at == None` means everything is unread. The marker is owned by
/// the read-state collaborator; the core holds a read-only cached copy and
/// only ever advances it through [`crate::infrastructure::read_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarker {
    pub member: MemberId,
    pub conversation: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<MessageId>,
}

impl ReadMarker {
    /// Fresh marker with nothing read yet.
    pub fn unread(member: MemberId, conversation: ConversationId) -> Self {
        Self {
            member,
            conversation,
            last_read_at: None,
            last_message_id: None,
        }
    }

    /// Whether a commit at `candidate` would move this marker forward.
    ///
    /// Strictly-after comparison: a commit at exactly the stored instant is
    /// not an advance, and `None` never advances anything.
    pub fn would_advance(&self, candidate: Option<DateTime<Utc>>) -> bool {
        match (self.last_read_at, candidate) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(current), Some(next)) => next > current,
        }
    }

    /// Monotonic merge: returns the advanced marker, or an unchanged clone
    /// when the candidate does not move the marker forward.
    pub fn advanced(
        &self,
        last_message_id: Option<MessageId>,
        last_read_at: Option<DateTime<Utc>>,
    ) -> Self {
        if !self.would_advance(last_read_at) {
            return self.clone();
        }
        Self {
            member: self.member.clone(),
            conversation: self.conversation.clone(),
            last_read_at,
            last_message_id,
        }
    }
}
