use uuid::Uuid;

use nexcord_types::api::AddReactionRequest;

use crate::{ApiClient, ApiError, check};

impl ApiClient {
    /// POST /api/v1/messages/{message_id}/reactions
    pub async fn post_reaction(&self, message_id: Uuid, emoji: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/messages/{}/reactions", message_id)))
            .bearer_auth(self.session.token())
            .json(&AddReactionRequest {
                emoji: emoji.to_string(),
            })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
