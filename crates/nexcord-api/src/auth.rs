use std::fmt;

use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::info;
use uuid::Uuid;

use nexcord_types::api::{Claims, LoginRequest, TokenResponse};

use crate::{ApiConfig, ApiError, build_http};

/// Viewer identity plus credential, built once at startup and handed to
/// every component that talks to the server.
#[derive(Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: Option<String>,
    token: String,
}

impl Session {
    /// Build a session from an access token, reading the viewer id from its
    /// claims. The signature is not checked here; the server does that.
    pub fn from_token(token: impl Into<String>) -> Result<Self, ApiError> {
        let token = token.into();

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)?;

        Ok(Self {
            user_id: data.claims.sub,
            username: data.claims.username,
            token,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.user_id.to_string())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Exchange credentials for an access token and build a session from it.
pub async fn login(config: &ApiConfig, email: &str, password: &str) -> Result<Session, ApiError> {
    let http = build_http(config)?;
    let url = format!("{}/api/v1/auth/login", config.base_url.trim_end_matches('/'));

    let resp = http
        .post(url)
        .json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .send()
        .await?;
    let tokens: TokenResponse = crate::decode(resp).await?;

    let session = Session::from_token(tokens.access_token)?;
    info!("Logged in as {}", session.display_name());
    Ok(session)
}
