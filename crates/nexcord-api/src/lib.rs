pub mod auth;
pub mod channels;
pub mod files;
pub mod messages;
pub mod reactions;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use nexcord_types::api::{ErrorBody, UploadResponse};
use nexcord_types::{Channel, Message};

pub use auth::Session;
pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file too large ({size} bytes, max {max})")]
    FileTooLarge { size: u64, max: u64 },
}

/// The request/response boundary the synchronizer's owner talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, ApiError>;

    /// Most recent messages of a channel, in whatever order the server uses.
    async fn fetch_history(&self, channel_id: Uuid) -> Result<Vec<Message>, ApiError>;

    async fn send_message(&self, channel_id: Uuid, content: &str) -> Result<Message, ApiError>;

    async fn add_reaction(&self, message_id: Uuid, emoji: &str) -> Result<(), ApiError>;

    async fn upload_file(&self, path: &Path) -> Result<UploadResponse, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub history_limit: u32,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            history_limit: 50,
            timeout: Duration::from_secs(15),
        }
    }
}

/// REST client bound to one authenticated session.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    history_limit: u32,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, ApiError> {
        let http = build_http(config)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            history_limit: config.history_limit,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub(crate) fn build_http(config: &ApiConfig) -> Result<Client, ApiError> {
    Ok(Client::builder().timeout(config.timeout).build()?)
}

/// Turn a non-2xx response into `ApiError::Status`, using the server's
/// `detail` field when present.
pub(crate) async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message())
        .unwrap_or(body);
    Err(ApiError::Status { status, detail })
}

pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    Ok(check(resp).await?.json::<T>().await?)
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.get_channels().await
    }

    async fn fetch_history(&self, channel_id: Uuid) -> Result<Vec<Message>, ApiError> {
        self.get_messages(channel_id, self.history_limit).await
    }

    async fn send_message(&self, channel_id: Uuid, content: &str) -> Result<Message, ApiError> {
        self.create_message(channel_id, content).await
    }

    async fn add_reaction(&self, message_id: Uuid, emoji: &str) -> Result<(), ApiError> {
        self.post_reaction(message_id, emoji).await
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        self.upload(path).await
    }
}
