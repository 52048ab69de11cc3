use crate::core::cmd::Cmd;
use crate::core::msg::{sync::SyncMsg, viewport::ViewportMsg, Msg};
use crate::core::state::SessionState;

/// Elm-like update function
/// Returns new state and list of commands from current state and message
pub fn update(msg: Msg, mut state: SessionState) -> (SessionState, Vec<Cmd>) {
    match msg {
        // Sync messages mutate the cache/marker and notify the viewport of
        // count changes in the same pass, so logically concurrent events
        // always read the latest value.
        Msg::Sync(sync_msg) => update_sync(sync_msg, state),

        // Viewport messages (delegated to ViewportState)
        Msg::Viewport(viewport_msg) => {
            let mut cmds = state.viewport.update(viewport_msg);
            // Reaching the bottom while unread content exists counts as
            // having seen the newest message: advance the marker.
            if reached_bottom(&cmds) && state.has_unread() {
                if let Some(cmd) = commit_read_cmd(&state) {
                    cmds.push(cmd);
                }
            }
            (state, cmds)
        }
    }
}

fn update_sync(msg: SyncMsg, mut state: SessionState) -> (SessionState, Vec<Cmd>) {
    match msg {
        SyncMsg::MessageInserted(message) | SyncMsg::MessageSendStarted(message) => {
            let before = state.cache.len();
            let (cache, outcome) = state.cache.with_inserted(message);
            state.cache = cache;
            let cmds = if state.cache.len() == before {
                log::debug!("insert resolved without count change: {outcome:?}");
                Vec::new()
            } else {
                state.viewport.update(ViewportMsg::ContentChanged {
                    message_count: state.cache.len(),
                })
            };
            (state, cmds)
        }

        SyncMsg::MessageUpdated(message) => {
            state.cache = state.cache.with_updated(message);
            (state, vec![])
        }

        SyncMsg::MessageSendFailed { optimistic_id } => {
            state.cache = state.cache.with_send_failed(&optimistic_id);
            (state, vec![])
        }

        SyncMsg::HistoryLoaded(page) => {
            let before = state.cache.len();
            state.cache = state.cache.with_older_page(page.messages);
            let cmds = if state.cache.len() == before {
                Vec::new()
            } else {
                state.viewport.update(ViewportMsg::ContentChanged {
                    message_count: state.cache.len(),
                })
            };
            (state, cmds)
        }

        SyncMsg::HistoryLoadFailed { reason } => {
            // Recoverable: the fetch collaborator re-arms and the next
            // qualifying scroll event triggers the same fetch again.
            let cmds = vec![Cmd::LogError {
                message: format!("history fetch failed: {reason}"),
            }];
            (state, cmds)
        }

        SyncMsg::MarkRead => {
            let cmds = commit_read_cmd(&state).into_iter().collect();
            (state, cmds)
        }

        SyncMsg::MarkerUpdated(marker) => {
            state.marker = Some(marker);
            (state, vec![])
        }
    }
}

/// Commit the newest known message as read; nothing to commit on an empty
/// conversation.
fn commit_read_cmd(state: &SessionState) -> Option<Cmd> {
    let newest = state.newest_message()?;
    Some(Cmd::CommitRead {
        member: state.member.clone(),
        conversation: state.conversation.clone(),
        last_message_id: Some(newest.id().clone()),
        last_read_at: Some(newest.created_at().into_inner()),
    })
}

fn reached_bottom(cmds: &[Cmd]) -> bool {
    cmds.iter()
        .any(|cmd| matches!(cmd, Cmd::NotifyAtBottom { at_bottom: true }))
}
