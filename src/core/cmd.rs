use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::state::viewport::ScrollBehavior;
use crate::domain::message::{ConversationId, MemberId, MessageId};

/// Elm-like command definitions: side effects the runtime executes on
/// behalf of the pure update function (network calls, timers, surface
/// manipulation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmd {
    /// Fetch the next page of older messages (backward pagination).
    LoadOlder,

    /// Advance the member's read marker via the read-state collaborator.
    /// A non-advancing commit is rejected server-side and still counts as
    /// success here.
    CommitRead {
        member: MemberId,
        conversation: ConversationId,
        last_message_id: Option<MessageId>,
        last_read_at: Option<DateTime<Utc>>,
    },

    /// Start the auto-scroll debounce timer; it reports back as
    /// `ViewportMsg::AutoScrollFired` with the same generation.
    ScheduleAutoScroll { generation: u64, delay_ms: u64 },

    /// A queued auto-scroll was preempted. The generation bump already
    /// invalidates the timer; this is a hint for hosts that keep a real
    /// timer handle.
    CancelAutoScroll,

    /// Move the surface to the newest message.
    ScrollToNewest { behavior: ScrollBehavior },

    /// The at-bottom flag flipped (edge-triggered).
    NotifyAtBottom { at_bottom: bool },

    /// Logging
    LogError { message: String },
    LogInfo { message: String },

    /// Batch command (execute multiple commands together)
    Batch(Vec<Cmd>),

    /// Do nothing (for testing)
    None,
}

impl Cmd {
    /// Combine multiple commands into one
    pub fn batch(commands: Vec<Cmd>) -> Cmd {
        match commands.len() {
            0 => Cmd::None,
            1 => commands.into_iter().next().unwrap_or(Cmd::None),
            _ => Cmd::Batch(commands),
        }
    }

    /// Whether the command requires asynchronous processing
    pub fn is_async(&self) -> bool {
        match self {
            Cmd::LoadOlder | Cmd::CommitRead { .. } | Cmd::ScheduleAutoScroll { .. } => true,

            Cmd::CancelAutoScroll
            | Cmd::ScrollToNewest { .. }
            | Cmd::NotifyAtBottom { .. }
            | Cmd::LogError { .. }
            | Cmd::LogInfo { .. }
            | Cmd::None => false,

            Cmd::Batch(cmds) => cmds.iter().any(|cmd| cmd.is_async()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_batch_empty() {
        let cmd = Cmd::batch(vec![]);
        assert_eq!(cmd, Cmd::None);
    }

    #[test]
    fn test_cmd_batch_single() {
        let original_cmd = Cmd::LoadOlder;
        let cmd = Cmd::batch(vec![original_cmd.clone()]);
        assert_eq!(cmd, original_cmd);
    }

    #[test]
    fn test_cmd_batch_multiple() {
        // Batch should wrap when there are 2+ commands
        let cmds = vec![Cmd::LoadOlder, Cmd::CancelAutoScroll];
        let batch_cmd = Cmd::batch(cmds.clone());
        assert_eq!(batch_cmd, Cmd::Batch(cmds));
    }

    #[test]
    fn test_cmd_is_async() {
        assert!(Cmd::LoadOlder.is_async());
        assert!(Cmd::ScheduleAutoScroll {
            generation: 1,
            delay_ms: 100
        }
        .is_async());
        assert!(!Cmd::NotifyAtBottom { at_bottom: true }.is_async());
        assert!(!Cmd::CancelAutoScroll.is_async());
    }

    #[test]
    fn test_cmd_batch_is_async() {
        let sync_batch = Cmd::Batch(vec![Cmd::LogInfo {
            message: "test".to_string(),
        }]);
        assert!(!sync_batch.is_async());

        let async_batch = Cmd::Batch(vec![Cmd::LoadOlder]);
        assert!(async_batch.is_async());
    }

    #[test]
    fn test_cmd_serialization() {
        let cmd = Cmd::CommitRead {
            member: MemberId::new("alice"),
            conversation: ConversationId::Channel(crate::domain::message::ChannelId::new(
                "general",
            )),
            last_message_id: Some(MessageId::new("m-9")),
            last_read_at: None,
        };

        let serialized = serde_json::to_string(&cmd).expect("serialize");
        let deserialized: Cmd = serde_json::from_str(&serialized).expect("deserialize");
        assert_eq!(cmd, deserialized);
    }
}
