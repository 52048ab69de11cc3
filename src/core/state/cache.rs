//! Paginated message cache and the live-update reducer over it.

use derive_deref::{Deref, DerefMut};

use crate::domain::message::{Message, MessageId, OptimisticId};

/// One fetched page of messages, newest first within the page.
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct Page(Vec<Message>);

impl Page {
    pub fn new(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl From<Vec<Message>> for Page {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

/// What [`PaginatedCache::with_inserted`] did with an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New message, prepended to the newest page.
    Prepended,
    /// Same server id was already cached (duplicate delivery); replaced.
    ReplacedById,
    /// Server echo of a local optimistic send; replaced in place.
    ReplacedOptimistic,
    /// Malformed input (empty id); dropped.
    Ignored,
}

/// The client-held view of a conversation's messages: an ordered sequence of
/// pages, newest page first, newest message first within each page.
///
/// Invariant: concatenating all pages yields the known messages most recent
/// first, and no id appears twice. Historical pages were fetched under their
/// own pagination cursors, so the reducer never rewrites them; live inserts
/// only touch the newest page.
///
/// Entry points take `&self` and return a fresh value so that a consumer
/// still holding the previous cache (e.g. for diffing) sees it unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginatedCache {
    pages: Vec<Page>,
}

impl PaginatedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from an initial page fetch.
    pub fn from_page(messages: Vec<Message>) -> Self {
        Self {
            pages: vec![Page::new(messages)],
        }
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|page| page.is_empty())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All known messages, newest first across page boundaries.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.pages.iter().flat_map(|page| page.iter())
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.position_of(id)
            .map(|(page, index)| &self.pages[page][index])
    }

    /// The most recent known message.
    pub fn newest(&self) -> Option<&Message> {
        self.iter().next()
    }

    /// The oldest known message; its id is the backward-pagination cursor.
    pub fn oldest(&self) -> Option<&Message> {
        self.pages
            .iter()
            .rev()
            .find_map(|page| page.last())
    }

    pub fn oldest_id(&self) -> Option<&MessageId> {
        self.oldest().map(Message::id)
    }

    fn position_of(&self, id: &MessageId) -> Option<(usize, usize)> {
        if id.is_empty() {
            return None;
        }
        self.pages.iter().enumerate().find_map(|(p, page)| {
            page.iter()
                .position(|message| message.id() == id)
                .map(|i| (p, i))
        })
    }

    /// Merge a pushed "message added" event.
    ///
    /// Duplicate deliveries (same id) and server echoes of optimistic sends
    /// (same `optimistic_id` in the newest page) replace the existing entry
    /// in place, preserving its position so confirmation never reorders the
    /// visible list. Everything else is prepended to the newest page.
    pub fn with_inserted(&self, message: Message) -> (Self, InsertOutcome) {
        if message.id().is_empty() && message.optimistic_id().is_none() {
            log::warn!("dropping pushed message without id");
            return (self.clone(), InsertOutcome::Ignored);
        }

        let mut next = self.clone();

        if let Some((page, index)) = next.position_of(message.id()) {
            next.pages[page][index] = message;
            return (next, InsertOutcome::ReplacedById);
        }

        if let Some(optimistic_id) = message.optimistic_id().cloned() {
            if let Some(index) = next.optimistic_position(&optimistic_id) {
                next.pages[0][index] = message;
                return (next, InsertOutcome::ReplacedOptimistic);
            }
        }

        if next.pages.is_empty() {
            next.pages.push(Page::new(vec![message]));
        } else {
            next.pages[0].insert(0, message);
        }
        (next, InsertOutcome::Prepended)
    }

    /// Merge a pushed "message updated" event (edit, reaction change).
    ///
    /// Updates only target already-known messages; an unknown id is a race
    /// with an insert or belongs to an unloaded page and is silently dropped.
    pub fn with_updated(&self, message: Message) -> Self {
        if message.id().is_empty() {
            log::warn!("dropping message update without id");
            return self.clone();
        }
        let mut next = self.clone();
        match next.position_of(message.id()) {
            Some((page, index)) => next.pages[page][index] = message,
            None => log::debug!("update for unknown message {}, ignoring", message.id()),
        }
        next
    }

    /// Append a page of older messages fetched via backward pagination.
    ///
    /// Ids already known (overlapping cursors, duplicate delivery) are
    /// dropped from the incoming page; an empty remainder appends nothing.
    pub fn with_older_page(&self, messages: Vec<Message>) -> Self {
        let mut next = self.clone();
        let fresh: Vec<Message> = messages
            .into_iter()
            .filter(|message| !next.contains(message.id()))
            .collect();
        if !fresh.is_empty() {
            next.pages.push(Page::new(fresh));
        }
        next
    }

    /// Flip a still-pending optimistic entry to `Failed`, in place.
    pub fn with_send_failed(&self, optimistic_id: &OptimisticId) -> Self {
        let mut next = self.clone();
        if let Some(index) = next.optimistic_position(optimistic_id) {
            next.pages[0][index].body_mut().status =
                Some(crate::domain::message::DeliveryStatus::Failed);
        }
        next
    }

    /// Optimistic entries only ever live in the newest page.
    fn optimistic_position(&self, optimistic_id: &OptimisticId) -> Option<usize> {
        let first = self.pages.first()?;
        first.iter().position(|message| {
            message.is_optimistic() && message.optimistic_id() == Some(optimistic_id)
        })
    }
}
