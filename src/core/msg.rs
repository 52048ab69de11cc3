use serde::{Deserialize, Serialize};

pub mod sync;
pub mod viewport;

use sync::SyncMsg;
use viewport::ViewportMsg;

/// Domain messages representing everything that can change session state.
/// Processed by the update function; side effects come back as commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Msg {
    /// Pub/sub, history, and read-state events.
    Sync(SyncMsg),

    /// Scroll surface and auto-scroll timer events.
    Viewport(ViewportMsg),
}

impl Msg {
    /// Helper to exclude frequent messages from debug logging.
    pub fn is_frequent(&self) -> bool {
        match self {
            Self::Sync(msg) => msg.is_frequent(),
            Self::Viewport(msg) => msg.is_frequent(),
        }
    }
}
