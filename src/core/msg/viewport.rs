use serde::{Deserialize, Serialize};

use crate::core::state::viewport::ScrollMetrics;

/// Messages produced by the host view's scrollable surface and by the
/// auto-scroll debounce timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewportMsg {
    /// The surface scrolled (user input or programmatic). `can_load_more`
    /// is the fetch collaborator's state: more history exists and no fetch
    /// is in flight.
    ScrollMoved {
        metrics: ScrollMetrics,
        can_load_more: bool,
    },
    /// The number of cached messages changed (live insert or page load).
    ContentChanged { message_count: usize },
    /// The debounce timer for a queued auto-scroll elapsed.
    AutoScrollFired { generation: u64 },
    /// The viewport is being unmounted.
    Detached,
}

impl ViewportMsg {
    /// Scroll events fire continuously while the user drags; everything
    /// else is sparse.
    pub fn is_frequent(&self) -> bool {
        matches!(self, Self::ScrollMoved { .. })
    }
}
