//! # Roomsync - Realtime Conversation Sync Core
//!
//! Client-side message synchronization for group-chat applications, built
//! around an Elm-like architecture for predictable state management.
//!
//! ## Architecture Overview
//!
//! This crate is organized around the Elm architecture pattern:
//!
//! - **Model** (`core::state`): one conversation view's state — the
//!   paginated message cache, the cached read marker, the viewport session
//! - **Message** (`core::msg`): events that can change the state — pub/sub
//!   deliveries, scroll reports, timer firings, fetch results
//! - **Update** (`core::update`): pure function transforming state
//! - **Command** (`core::cmd`): side effects (fetches, commits, timers)
//! - **Runtime** (`infrastructure::session`): executes commands against the
//!   collaborator seams (pub/sub feed, history loader, read-state endpoint)
//!
//! ## Example Usage
//!
//! ```rust
//! use roomsync::core::msg::{viewport::ViewportMsg, Msg};
//! use roomsync::core::state::SessionState;
//! use roomsync::core::update::update;
//!
//! let state = SessionState::default();
//!
//! // Process messages
//! let (state, cmds) = update(
//!     Msg::Viewport(ViewportMsg::ContentChanged { message_count: 0 }),
//!     state,
//! );
//!
//! // An empty conversation finishes its first layout pass quietly.
//! assert!(cmds.is_empty());
//! assert!(!state.has_unread());
//! ```
//!
//! ## Key Properties
//!
//! - **No duplication**: at-least-once pub/sub delivery and optimistic-send
//!   echoes deduplicate by id and correlation id
//! - **No scroll-jacking**: auto-scroll is debounced and any manual scroll
//!   preempts it
//! - **No fatal paths**: malformed input degrades to over-showing unread
//!   state, never to a crash
//!
//! ## Modules
//!
//! - [`core`] - State, messages, commands, and the update function
//! - [`domain`] - Message and read-marker data model
//! - [`infrastructure`] - Collaborator seams and the session runtime
//! - [`utils`] - Logging and path helpers

#![allow(dead_code)]

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod utils;

// Re-exports for convenience
pub use crate::core::cmd::Cmd;
pub use crate::core::msg::Msg;
pub use crate::core::state::SessionState;
pub use crate::core::update::update;
pub use crate::domain::message::Message;

/// Result type used throughout the library
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
