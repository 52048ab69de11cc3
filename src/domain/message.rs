use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-assigned message identifier, unique within its conversation.
///
/// An empty id marks a malformed payload; the reducer ignores such input
/// instead of erroring (at-least-once delivery may replay garbage).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-generated correlation id for a not-yet-confirmed local send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptimisticId(String);

impl OptimisticId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a member (the message author or the reading member).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a multi-member channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a two-member direct conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectConversationId(String);

impl DirectConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The unit of message grouping and subscription: a channel or a direct
/// conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationId {
    Channel(ChannelId),
    Direct(DirectConversationId),
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::Channel(ChannelId::default())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel:{}", id.as_str()),
            Self::Direct(id) => write!(f, "direct:{}", id.as_str()),
        }
    }
}

/// Delivery status of a locally created message.
///
/// Present only on optimistic entries; a server-assigned message carries no
/// status (or `Sent` once confirmed).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Failed,
    Sent,
}

/// A single emoji reaction attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub member: MemberId,
}

/// Poll payload carried by a message, opaque to the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Creation/update instant of a message.
///
/// Wire payloads carry either a native unix-millisecond number or an
/// ISO-8601 string. Anything unparseable decodes as "now" so that a garbled
/// timestamp shows up as unread instead of being silently hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime(DateTime<Utc>);

impl EventTime {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0.timestamp_millis())
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl EventTime {
    /// Lenient decoding used for pushed payloads; see type-level docs.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let parsed = match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(Self::interpret_unix),
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Self(dt.with_timezone(&Utc))),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            log::warn!("unparseable timestamp {value:?}, treating as now");
            Self::now()
        })
    }

    /// Numbers below the millisecond range are taken as unix seconds.
    fn interpret_unix(raw: i64) -> Option<Self> {
        const MILLIS_THRESHOLD: i64 = 100_000_000_000;
        if raw.abs() >= MILLIS_THRESHOLD {
            Self::from_unix_millis(raw)
        } else {
            DateTime::from_timestamp(raw, 0).map(Self)
        }
    }
}

/// Fields shared by channel and direct messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    #[serde(default)]
    pub id: MessageId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    pub created_at: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<EventTime>,
    pub author: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimistic_id: Option<OptimisticId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
}

impl MessageBody {
    pub fn new(
        id: MessageId,
        author: MemberId,
        content: impl Into<String>,
        created_at: EventTime,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            attachment: None,
            created_at,
            updated_at: None,
            author,
            poll: None,
            reactions: Vec::new(),
            optimistic_id: None,
            status: None,
        }
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    pub fn with_updated_at(mut self, at: EventTime) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn with_optimistic_id(mut self, id: OptimisticId) -> Self {
        self.optimistic_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A message in a conversation, discriminated at construction time.
///
/// The two variants share [`MessageBody`]; on the wire they differ only by
/// the owning-conversation field (`channel` vs `conversation`), which is
/// what the untagged representation matches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Channel {
        channel: ChannelId,
        #[serde(flatten)]
        body: MessageBody,
    },
    Direct {
        conversation: DirectConversationId,
        #[serde(flatten)]
        body: MessageBody,
    },
}

impl Message {
    pub fn channel(channel: ChannelId, body: MessageBody) -> Self {
        Self::Channel { channel, body }
    }

    pub fn direct(conversation: DirectConversationId, body: MessageBody) -> Self {
        Self::Direct { conversation, body }
    }

    pub fn body(&self) -> &MessageBody {
        match self {
            Self::Channel { body, .. } | Self::Direct { body, .. } => body,
        }
    }

    pub fn body_mut(&mut self) -> &mut MessageBody {
        match self {
            Self::Channel { body, .. } | Self::Direct { body, .. } => body,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.body().id
    }

    pub fn created_at(&self) -> EventTime {
        self.body().created_at
    }

    pub fn author(&self) -> &MemberId {
        &self.body().author
    }

    pub fn optimistic_id(&self) -> Option<&OptimisticId> {
        self.body().optimistic_id.as_ref()
    }

    pub fn status(&self) -> Option<DeliveryStatus> {
        self.body().status
    }

    /// True for a locally created entry still awaiting its server echo.
    pub fn is_optimistic(&self) -> bool {
        matches!(
            self.status(),
            Some(DeliveryStatus::Pending) | Some(DeliveryStatus::Failed)
        )
    }

    pub fn conversation(&self) -> ConversationId {
        match self {
            Self::Channel { channel, .. } => ConversationId::Channel(channel.clone()),
            Self::Direct { conversation, .. } => ConversationId::Direct(conversation.clone()),
        }
    }
}

/// One backward-pagination fetch result: a page of older messages plus a
/// continuation flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}
