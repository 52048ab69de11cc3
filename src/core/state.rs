use chrono::{DateTime, Utc};

use crate::domain::marker::ReadMarker;
use crate::domain::message::{ConversationId, MemberId, Message};
use crate::infrastructure::config::Config;

pub mod cache;
pub mod unread;
pub mod viewport;

pub use cache::{InsertOutcome, Page, PaginatedCache};
pub use viewport::ViewportState;

/// Configuration state - holds all user-configurable settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    /// Current configuration loaded from file
    pub config: Config,
}

/// State of one active conversation view.
///
/// Owns the paginated cache and the viewport session exclusively; both are
/// discarded together when the conversation changes. The read marker is a
/// read-only cached copy of what the read-state collaborator stores, used
/// only to drive the unread boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub member: MemberId,
    pub conversation: ConversationId,
    pub cache: PaginatedCache,
    pub marker: Option<ReadMarker>,
    pub viewport: ViewportState,
    pub config: ConfigState,
}

impl SessionState {
    /// Initialize a session for one (member, conversation) pair.
    pub fn new(member: MemberId, conversation: ConversationId) -> Self {
        Self {
            member,
            conversation,
            ..Default::default()
        }
    }

    /// Initialize a session with explicit configuration.
    pub fn new_with_config(member: MemberId, conversation: ConversationId, config: Config) -> Self {
        Self {
            member,
            conversation,
            viewport: ViewportState::new(config.sync.auto_scroll),
            config: ConfigState { config },
            ..Default::default()
        }
    }

    pub fn message_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn newest_message(&self) -> Option<&Message> {
        self.cache.newest()
    }

    /// The cached marker's last-read instant; `None` means everything is
    /// unread (no marker yet, or a marker that never advanced).
    pub fn last_read_at(&self) -> Option<DateTime<Utc>> {
        self.marker.as_ref().and_then(|marker| marker.last_read_at)
    }

    /// Index of the unread boundary in the newest-first message list.
    pub fn unread_boundary(&self) -> Option<usize> {
        unread::find_unread_boundary(self.cache.iter(), self.last_read_at())
    }

    pub fn has_unread(&self) -> bool {
        unread::has_unread(self.cache.iter(), self.last_read_at())
    }
}
