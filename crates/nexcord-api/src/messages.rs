use tracing::debug;
use uuid::Uuid;

use nexcord_types::Message;
use nexcord_types::api::{HistoryQuery, SendMessageRequest};

use crate::{ApiClient, ApiError, decode};

/// The server caps page size at 100.
pub const MAX_HISTORY_LIMIT: u32 = 100;

impl ApiClient {
    /// GET /api/v1/messages/{channel_id}, newest first.
    pub async fn get_messages(&self, channel_id: Uuid, limit: u32) -> Result<Vec<Message>, ApiError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/messages/{}", channel_id)))
            .query(&HistoryQuery { limit })
            .bearer_auth(self.session.token())
            .send()
            .await?;
        let messages: Vec<Message> = decode(resp).await?;
        debug!("Fetched {} messages for channel {}", messages.len(), channel_id);
        Ok(messages)
    }

    /// POST /api/v1/messages/, returns the created record.
    pub async fn create_message(&self, channel_id: Uuid, content: &str) -> Result<Message, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/v1/messages/"))
            .bearer_auth(self.session.token())
            .json(&SendMessageRequest {
                channel_id,
                content: content.to_string(),
            })
            .send()
            .await?;
        decode(resp).await
    }
}
