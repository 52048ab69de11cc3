//! Unread-boundary evaluation.
//!
//! Pure functions: given a newest-first message list and a member's
//! last-read instant, find the index separating unread from read.

use chrono::{DateTime, Utc};

use crate::domain::message::Message;

/// Index of the unread boundary in a newest-first message list.
///
/// The boundary is the oldest message of the unread run: walking oldest to
/// newest, the first message created strictly after `last_read_at`,
/// translated back into newest-first index space. `None` when there is
/// nothing unread (or nothing at all); `last_read_at == None` means every
/// message is unread, so the boundary sits at the oldest index.
///
/// Comparison is strict: a message created at exactly `last_read_at` counts
/// as read, matching mark-as-read semantics that store the newest seen
/// message's own timestamp.
pub fn find_unread_boundary<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    last_read_at: Option<DateTime<Utc>>,
) -> Option<usize> {
    let stamps: Vec<DateTime<Utc>> = messages
        .into_iter()
        .map(|message| message.created_at().into_inner())
        .collect();
    if stamps.is_empty() {
        return None;
    }

    let last_read_at = match last_read_at {
        None => return Some(stamps.len() - 1),
        Some(at) => at,
    };

    stamps
        .iter()
        .rev()
        .position(|created_at| *created_at > last_read_at)
        .map(|from_oldest| stamps.len() - 1 - from_oldest)
}

/// Whether any message in the list is unread.
pub fn has_unread<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    last_read_at: Option<DateTime<Utc>>,
) -> bool {
    find_unread_boundary(messages, last_read_at).is_some()
}
