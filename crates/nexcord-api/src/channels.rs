use nexcord_types::Channel;

use crate::{ApiClient, ApiError, decode};

impl ApiClient {
    /// GET /api/v1/channels/
    pub async fn get_channels(&self) -> Result<Vec<Channel>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/v1/channels/"))
            .bearer_auth(self.session.token())
            .send()
            .await?;
        decode(resp).await
    }
}
