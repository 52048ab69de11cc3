//! Elm-like core: state, messages, commands, and the update function.

pub mod cmd;
pub mod msg;
pub mod state;
pub mod update;
