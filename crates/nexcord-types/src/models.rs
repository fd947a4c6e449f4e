use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[default]
    Public,
    Private,
    Direct,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// File reference attached to a message by the server. The server stores
/// attachments as free-form objects, so every field may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Reaction symbol -> ids of the users who reacted with it.
pub type Reactions = BTreeMap<String, BTreeSet<Uuid>>;

/// A chat message as returned by the history endpoint, the send endpoint and
/// the live gateway. Only `reactions` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Reactions,
}

impl Message {
    /// Total reactor count per symbol, in symbol order.
    pub fn reaction_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.reactions
            .iter()
            .filter(|(_, users)| !users.is_empty())
            .map(|(emoji, users)| (emoji.as_str(), users.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_message_with_naive_timestamp() {
        let json = r#"{
            "id": "6f0c7a8e-1f7e-4a59-9b39-2a4f5d1c9e01",
            "channel_id": "0b4a3c2d-5e6f-4789-8abc-def012345678",
            "user_id": "11111111-2222-4333-8444-555555555555",
            "content": "hello",
            "parent_id": null,
            "is_edited": false,
            "is_pinned": false,
            "reactions": {"👍": ["11111111-2222-4333-8444-555555555555"]},
            "mentions": [],
            "attachments": [],
            "created_at": "2024-05-01T12:00:00.000001",
            "updated_at": "2024-05-01T12:00:00.000001"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.reaction_counts().collect::<Vec<_>>(), vec![("👍", 1)]);
    }

    #[test]
    fn decodes_minimal_message() {
        let json = r#"{
            "id": "6f0c7a8e-1f7e-4a59-9b39-2a4f5d1c9e01",
            "channel_id": "0b4a3c2d-5e6f-4789-8abc-def012345678",
            "user_id": "11111111-2222-4333-8444-555555555555",
            "content": "hi",
            "created_at": "2024-05-01T12:00:00Z"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.attachments.is_empty());
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn loose_attachment_does_not_fail_history_page() {
        let json = r#"[
            {
                "id": "6f0c7a8e-1f7e-4a59-9b39-2a4f5d1c9e01",
                "channel_id": "0b4a3c2d-5e6f-4789-8abc-def012345678",
                "user_id": "11111111-2222-4333-8444-555555555555",
                "content": "see file",
                "attachments": [{"filename": "a.pdf", "uploaded_by": "someone"}],
                "created_at": "2024-05-01T12:00:01"
            },
            {
                "id": "6f0c7a8e-1f7e-4a59-9b39-2a4f5d1c9e02",
                "channel_id": "0b4a3c2d-5e6f-4789-8abc-def012345678",
                "user_id": "11111111-2222-4333-8444-555555555555",
                "content": "plain",
                "created_at": "2024-05-01T12:00:00"
            }
        ]"#;

        let page: Vec<Message> = serde_json::from_str(json).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].attachments[0].filename, "a.pdf");
        assert!(page[0].attachments[0].url.is_empty());
        assert!(page[1].attachments.is_empty());
    }

    #[test]
    fn channel_kind_uses_type_field() {
        let json = r#"{
            "id": "0b4a3c2d-5e6f-4789-8abc-def012345678",
            "name": "general",
            "description": null,
            "type": "private",
            "owner_id": "11111111-2222-4333-8444-555555555555",
            "created_at": "2024-05-01T12:00:00"
        }"#;

        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.kind, ChannelKind::Private);
    }
}
