use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims carried by the access token. The client only reads them to learn
/// the viewer id; signature checks belong to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<usize>,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub channel_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: u32,
}

// -- Reactions --

#[derive(Debug, Serialize, Deserialize)]
pub struct AddReactionRequest {
    pub emoji: String,
}

// -- Files --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl UploadResponse {
    /// Message text announcing an uploaded file. Attachments travel as plain
    /// text, not as structured records.
    pub fn as_message_content(&self) -> String {
        format!("📎 File uploaded: {}\n{}", self.filename, self.url)
    }
}

// -- Errors --

/// Error body returned by the API (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
