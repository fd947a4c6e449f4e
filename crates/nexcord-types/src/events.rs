use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Events received FROM the server over the live gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A message was created in some channel
    Message(Message),

    /// A user started typing
    Typing { channel_id: Option<Uuid>, user_id: Uuid },

    /// A user came online or went offline
    Presence {
        user_id: Uuid,
        status: String,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// A user read a message
    ReadReceipt {
        channel_id: Option<Uuid>,
        user_id: Uuid,
        message_id: Option<Uuid>,
    },

    /// A reaction was added to a message
    ReactionAdd {
        channel_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },

    /// A reaction was removed from a message
    ReactionRemove {
        channel_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },

    /// Server-side rejection of a gateway command (e.g. rate limit)
    Error { message: String },

    /// A gateway-sent message was flagged by moderation
    ModerationWarning {
        message: String,
        #[serde(default)]
        categories: HashMap<String, bool>,
    },

    #[serde(other)]
    Unknown,
}

impl GatewayEvent {
    /// Returns the channel_id if this event is scoped to a specific channel.
    pub fn channel_id(&self) -> Option<Uuid> {
        match self {
            Self::Message(msg) => Some(msg.channel_id),
            Self::Typing { channel_id, .. } => *channel_id,
            Self::ReadReceipt { channel_id, .. } => *channel_id,
            Self::ReactionAdd { channel_id, .. } => Some(*channel_id),
            Self::ReactionRemove { channel_id, .. } => Some(*channel_id),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Announce a message that was just created through the REST API
    Message { channel_id: Uuid, content: String },

    /// Indicate typing in a channel
    Typing { channel_id: Uuid },

    /// Mark a message as read
    ReadReceipt { channel_id: Uuid, message_id: Uuid },
}
