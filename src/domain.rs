//! Domain model
//!
//! Pure data types shared by the core and the collaborator seams:
//! - Messages (channel and direct variants over a common body)
//! - Read markers

pub mod marker;
pub mod message;

pub use marker::ReadMarker;
pub use message::{
    ChannelId, ConversationId, DeliveryStatus, DirectConversationId, EventTime, MemberId, Message,
    MessageBody, MessageId, MessagePage, OptimisticId,
};
