use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::cmd::Cmd;
use crate::core::msg::{sync::SyncMsg, viewport::ViewportMsg, Msg};
use crate::core::state::viewport::{ScrollBehavior, ScrollMetrics};
use crate::core::state::SessionState;
use crate::core::update::update;
use crate::domain::message::{Message, OptimisticId};
use crate::infrastructure::history::{HistoryLoader, HistoryState};
use crate::infrastructure::read_state::{CommitRead, ReadStateCommitter};
use crate::infrastructure::subscription::{ConversationFeed, SubscriptionHandle};

/// The host view's scrollable surface. Rendering is out of scope; the
/// runtime only ever asks it to move to the newest message, and the host
/// reports metrics back through [`SessionDriver::scroll_moved`].
pub trait ViewportSurface: Send + Sync {
    fn scroll_to_newest(&self, behavior: ScrollBehavior);
}

/// Inputs from the host view, funneled into the runtime's event loop.
#[derive(Debug, Clone)]
pub enum SessionInput {
    Scroll(ScrollMetrics),
    MarkRead,
    SendStarted(Message),
    SendFailed(OptimisticId),
    Detach,
}

/// Notifications the host view subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AtBottomChanged(bool),
}

/// Cloneable sender half handed to the host view.
#[derive(Debug, Clone)]
pub struct SessionDriver {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionDriver {
    pub fn scroll_moved(&self, metrics: ScrollMetrics) {
        let _ = self.tx.send(SessionInput::Scroll(metrics));
    }

    pub fn mark_read(&self) {
        let _ = self.tx.send(SessionInput::MarkRead);
    }

    pub fn message_send_started(&self, message: Message) {
        let _ = self.tx.send(SessionInput::SendStarted(message));
    }

    pub fn message_send_failed(&self, optimistic_id: OptimisticId) {
        let _ = self.tx.send(SessionInput::SendFailed(optimistic_id));
    }

    pub fn detach(&self) {
        let _ = self.tx.send(SessionInput::Detach);
    }
}

/// Event loop for one conversation view.
///
/// Every event — pub/sub delivery, scroll report, timer firing, fetch
/// result — is applied sequentially against the latest state, so logically
/// concurrent events never read a stale snapshot. The subscription, the
/// pending timers, and the cache share one lifecycle: [`Self::shutdown`]
/// tears them down together before the next conversation's session exists,
/// so no stale callback can touch a new cache.
pub struct SessionRuntime<L, C, S> {
    state: SessionState,
    history: HistoryState,
    loader: Arc<L>,
    committer: Arc<C>,
    surface: Arc<S>,
    subscription: SubscriptionHandle,
    cancel: CancellationToken,
    msg_tx: mpsc::UnboundedSender<Msg>,
    // Taken by `run()`; Option so teardown in Drop can leave them behind.
    msg_rx: Option<mpsc::UnboundedReceiver<Msg>>,
    input_rx: Option<mpsc::UnboundedReceiver<SessionInput>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<L, C, S> SessionRuntime<L, C, S>
where
    L: HistoryLoader + 'static,
    C: ReadStateCommitter + 'static,
    S: ViewportSurface + 'static,
{
    /// Subscribe to the conversation's channel and assemble the runtime.
    /// Returns the runtime, the driver for the host view, and the event
    /// receiver for at-bottom notifications.
    pub fn new(
        state: SessionState,
        feed: &dyn ConversationFeed,
        loader: Arc<L>,
        committer: Arc<C>,
        surface: Arc<S>,
    ) -> (
        Self,
        SessionDriver,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let subscription = Self::pump_subscription(&state, feed, msg_tx.clone(), &cancel);

        let runtime = Self {
            state,
            history: HistoryState::new(),
            loader,
            committer,
            surface,
            subscription,
            cancel,
            msg_tx,
            msg_rx: Some(msg_rx),
            input_rx: Some(input_rx),
            events_tx,
        };
        (runtime, SessionDriver { tx: input_tx }, events_rx)
    }

    /// Forward decoded live events into the message loop until cancelled.
    fn pump_subscription(
        state: &SessionState,
        feed: &dyn ConversationFeed,
        msg_tx: mpsc::UnboundedSender<Msg>,
        cancel: &CancellationToken,
    ) -> SubscriptionHandle {
        let subscription = feed.subscribe(&state.conversation);
        let handle = subscription.handle.clone();
        let mut events = subscription.events;
        let cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.next() => match event {
                        Some(event) => {
                            if let Some(sync_msg) = event.into_sync_msg() {
                                if msg_tx.send(Msg::Sync(sync_msg)).is_err() {
                                    break;
                                }
                            }
                        }
                        None => break,
                    }
                }
            }
        });
        handle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    /// Tear down the subscription and invalidate pending timers together.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.subscription.unsubscribe();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive the session until shutdown. Returns the final state.
    pub async fn run(mut self) -> SessionState {
        let mut input_rx = self
            .input_rx
            .take()
            .expect("BUG: run() called twice on one session");
        let mut msg_rx = self
            .msg_rx
            .take()
            .expect("BUG: run() called twice on one session");
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                input = input_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                msg = msg_rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg),
                    None => break,
                },
            }
        }
        self.shutdown();
        std::mem::take(&mut self.state)
    }

    /// Translate a host input into a domain message. Scroll reports are
    /// composed with the fetch collaborator's state here, so the pure
    /// controller never owns it.
    pub fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::Scroll(metrics) => self.dispatch(Msg::Viewport(ViewportMsg::ScrollMoved {
                metrics,
                can_load_more: self.history.can_load_more(),
            })),
            SessionInput::MarkRead => self.dispatch(Msg::Sync(SyncMsg::MarkRead)),
            SessionInput::SendStarted(message) => {
                self.dispatch(Msg::Sync(SyncMsg::MessageSendStarted(message)));
            }
            SessionInput::SendFailed(optimistic_id) => {
                self.dispatch(Msg::Sync(SyncMsg::MessageSendFailed { optimistic_id }));
            }
            SessionInput::Detach => {
                self.dispatch(Msg::Viewport(ViewportMsg::Detached));
                self.shutdown();
            }
        }
    }

    /// Apply one message and execute the resulting commands.
    pub fn dispatch(&mut self, msg: Msg) {
        if !msg.is_frequent() {
            log::debug!("dispatching {msg:?}");
        }

        // Fetch bookkeeping happens alongside the pure update so that
        // `can_load_more` is accurate for the very next scroll event.
        match &msg {
            Msg::Sync(SyncMsg::HistoryLoaded(page)) => self.history.finish(page.has_more),
            Msg::Sync(SyncMsg::HistoryLoadFailed { .. }) => self.history.fail(),
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (state, cmds) = update(msg, state);
        self.state = state;

        for cmd in cmds {
            self.execute(cmd);
        }
    }

    fn execute(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::LoadOlder => self.execute_load_older(),

            Cmd::CommitRead {
                member,
                conversation,
                last_message_id,
                last_read_at,
            } => {
                let committer = Arc::clone(&self.committer);
                let msg_tx = self.msg_tx.clone();
                let future = committer.commit_read(CommitRead {
                    member,
                    conversation,
                    last_message_id,
                    last_read_at,
                });
                tokio::spawn(async move {
                    match future.await {
                        // Advanced or already current: both are success.
                        Ok(marker) => {
                            let _ = msg_tx.send(Msg::Sync(SyncMsg::MarkerUpdated(marker)));
                        }
                        Err(e) => log::warn!("read commit failed: {e}"),
                    }
                });
            }

            Cmd::ScheduleAutoScroll {
                generation,
                delay_ms,
            } => {
                let msg_tx = self.msg_tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                            let _ = msg_tx.send(Msg::Viewport(ViewportMsg::AutoScrollFired {
                                generation,
                            }));
                        }
                    }
                });
            }

            // The generation bump already invalidated the timer; nothing to
            // tear down for a spawned sleep.
            Cmd::CancelAutoScroll => log::trace!("auto-scroll preempted"),

            Cmd::ScrollToNewest { behavior } => self.surface.scroll_to_newest(behavior),

            Cmd::NotifyAtBottom { at_bottom } => {
                let _ = self.events_tx.send(SessionEvent::AtBottomChanged(at_bottom));
            }

            Cmd::LogError { message } => log::error!("{message}"),
            Cmd::LogInfo { message } => log::info!("{message}"),

            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }

            Cmd::None => {}
        }
    }

    fn execute_load_older(&mut self) {
        if !self.history.begin() {
            log::debug!("backward fetch skipped: already in flight or exhausted");
            return;
        }
        let loader = Arc::clone(&self.loader);
        let msg_tx = self.msg_tx.clone();
        let cursor = self.state.cache.oldest_id().cloned();
        let limit = self.state.config.config.sync.page_size;
        let future = loader.load_before(&self.state.conversation, cursor, limit);
        tokio::spawn(async move {
            let msg = match future.await {
                Ok(page) => Msg::Sync(SyncMsg::HistoryLoaded(page)),
                Err(e) => Msg::Sync(SyncMsg::HistoryLoadFailed {
                    reason: e.to_string(),
                }),
            };
            let _ = msg_tx.send(msg);
        });
    }
}

impl<L, C, S> Drop for SessionRuntime<L, C, S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.subscription.unsubscribe();
    }
}
