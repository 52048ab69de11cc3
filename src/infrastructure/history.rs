use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::domain::message::{ConversationId, Message, MessageId, MessagePage};

/// Errors from a backward-pagination fetch. Recoverable: the caller may
/// re-trigger the same fetch on the next qualifying scroll event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Transport { reason: String },
    Decode { reason: String },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { reason } => write!(f, "transport failure: {reason}"),
            Self::Decode { reason } => write!(f, "decode failure: {reason}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Backward-pagination fetch collaborator.
///
/// `cursor` is the oldest known message id (`None` for the initial page);
/// the returned page holds strictly older messages, newest first, plus a
/// continuation flag. Retry policy belongs to the implementation, not the
/// core.
pub trait HistoryLoader: Send + Sync {
    fn load_before(
        &self,
        conversation: &ConversationId,
        cursor: Option<MessageId>,
        limit: usize,
    ) -> BoxFuture<'static, Result<MessagePage, LoadError>>;
}

/// Fetch state owned by the data-fetching side, surfaced to the scroll
/// controller as its `can_load_more` input. One in-flight backward fetch at
/// a time; a failure re-arms instead of latching "no more pages".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryState {
    in_flight: bool,
    exhausted: bool,
}

impl HistoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_load_more(&self) -> bool {
        !self.in_flight && !self.exhausted
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Claim the fetch slot. Returns false when a fetch is already running
    /// or history is exhausted.
    pub fn begin(&mut self) -> bool {
        if !self.can_load_more() {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn finish(&mut self, has_more: bool) {
        self.in_flight = false;
        self.exhausted = !has_more;
    }

    /// A failed fetch never counts as "no more pages".
    pub fn fail(&mut self) {
        self.in_flight = false;
    }
}

/// In-process loader over a pre-seeded archive, oldest first. Used by the
/// integration tests; real deployments implement [`HistoryLoader`] over
/// their fetch endpoint.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    archive: Arc<Mutex<Vec<Message>>>,
}

impl InMemoryHistory {
    /// `archive` must be ordered oldest first.
    pub fn new(archive: Vec<Message>) -> Self {
        Self {
            archive: Arc::new(Mutex::new(archive)),
        }
    }
}

impl HistoryLoader for InMemoryHistory {
    fn load_before(
        &self,
        _conversation: &ConversationId,
        cursor: Option<MessageId>,
        limit: usize,
    ) -> BoxFuture<'static, Result<MessagePage, LoadError>> {
        let archive = Arc::clone(&self.archive);
        async move {
            let archive = archive.lock().map_err(|e| LoadError::Transport {
                reason: e.to_string(),
            })?;
            let end = match cursor {
                None => archive.len(),
                Some(cursor) => archive
                    .iter()
                    .position(|message| message.id() == &cursor)
                    .unwrap_or(archive.len()),
            };
            let start = end.saturating_sub(limit);
            // Newest first within the page, like a real fetch endpoint.
            let messages: Vec<Message> = archive[start..end].iter().rev().cloned().collect();
            Ok(MessagePage {
                messages,
                has_more: start > 0,
            })
        }
        .boxed()
    }
}
