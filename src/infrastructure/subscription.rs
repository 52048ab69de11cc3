use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::msg::sync::SyncMsg;
use crate::domain::message::{ConversationId, Message};

/// Capacity of the in-memory broadcast channel; slow subscribers lag and
/// skip rather than block publishers.
const BROADCAST_CAPACITY: usize = 256;

/// An event pushed over a conversation's pub/sub channel.
///
/// Payloads are arbitrary JSON matching the [`Message`] wire shape plus the
/// `optimisticId` passthrough; decoding is deferred so that one malformed
/// payload never tears down the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum LiveEvent {
    MessageAdded(serde_json::Value),
    MessageUpdated(serde_json::Value),
}

impl LiveEvent {
    /// Decode into a core sync message. Malformed payloads are dropped with
    /// a warning; they are expected under at-least-once delivery and must
    /// never surface as user-visible errors.
    pub fn into_sync_msg(self) -> Option<SyncMsg> {
        match self {
            Self::MessageAdded(payload) => Self::decode(payload).map(SyncMsg::MessageInserted),
            Self::MessageUpdated(payload) => Self::decode(payload).map(SyncMsg::MessageUpdated),
        }
    }

    fn decode(payload: serde_json::Value) -> Option<Message> {
        match serde_json::from_value::<Message>(payload) {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("dropping malformed live payload: {e}");
                None
            }
        }
    }
}

/// Opaque capability for cancelling a subscription. Disposal is explicit:
/// call [`SubscriptionHandle::unsubscribe`]; the stream then terminates and
/// no further events are delivered.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// A live event stream for one conversation plus its disposal handle.
pub struct Subscription {
    pub events: BoxStream<'static, LiveEvent>,
    pub handle: SubscriptionHandle,
}

/// A source of per-conversation live event streams.
///
/// The transport behind this is out of scope: anything that can deliver a
/// conversation's events in server write order (at least once) fits.
pub trait ConversationFeed {
    fn subscribe(&self, conversation: &ConversationId) -> Subscription;
}

/// In-process feed backed by a tokio broadcast channel.
///
/// Used by the integration tests and suitable for wiring several views of
/// the same process together; real deployments implement
/// [`ConversationFeed`] over their transport instead.
#[derive(Debug, Clone)]
pub struct InMemoryFeed {
    tx: broadcast::Sender<(ConversationId, LiveEvent)>,
}

impl Default for InMemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Publish an event to every active subscriber of `conversation`.
    pub fn publish(&self, conversation: ConversationId, event: LiveEvent) {
        // No receivers is fine: nobody is looking at that conversation.
        let _ = self.tx.send((conversation, event));
    }
}

impl ConversationFeed for InMemoryFeed {
    fn subscribe(&self, conversation: &ConversationId) -> Subscription {
        let rx = self.tx.subscribe();
        let token = CancellationToken::new();
        let handle = SubscriptionHandle {
            token: token.clone(),
        };
        let target = conversation.clone();

        let events = stream::unfold((rx, token, target), |(mut rx, token, target)| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return None,
                    received = rx.recv() => match received {
                        Ok((conversation, event)) if conversation == target => {
                            return Some((event, (rx, token, target)));
                        }
                        // Event for another conversation: not ours.
                        Ok(_) => continue,
                        // Lagged behind the buffer; skip and keep going.
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!("subscription lagged, skipped {skipped} events");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed();

        Subscription { events, handle }
    }
}
