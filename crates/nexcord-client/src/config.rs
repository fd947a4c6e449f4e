use std::time::Duration;

use anyhow::{Context, Result, bail};

use nexcord_api::ApiConfig;
use nexcord_api::messages::MAX_HISTORY_LIMIT;
use nexcord_gateway::GatewayConfig;
use nexcord_sync::SyncConfig;

pub struct ClientConfig {
    pub api: ApiConfig,
    pub gateway: GatewayConfig,
    pub sync: SyncConfig,
    pub token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ClientConfig {
    /// Read configuration from `NEXCORD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("NEXCORD_API_URL").unwrap_or_else(|| "http://localhost:8000".into());
        let api_url = api_url.trim_end_matches('/').to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            bail!("NEXCORD_API_URL must be an http(s) URL, got '{}'", api_url);
        }
        let ws_url = non_empty("NEXCORD_WS_URL").unwrap_or_else(|| {
            api_url
                .replacen("https://", "wss://", 1)
                .replacen("http://", "ws://", 1)
        });

        let history_limit: u32 = non_empty("NEXCORD_HISTORY_LIMIT")
            .unwrap_or_else(|| "50".into())
            .parse()
            .context("NEXCORD_HISTORY_LIMIT must be a number")?;
        let timeout_secs: u64 = non_empty("NEXCORD_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "15".into())
            .parse()
            .context("NEXCORD_REQUEST_TIMEOUT_SECS must be a number")?;
        let reconcile_after_send = match non_empty("NEXCORD_RECONCILE_AFTER_SEND") {
            None => true,
            Some(v) => parse_bool(&v)
                .with_context(|| format!("NEXCORD_RECONCILE_AFTER_SEND: invalid value '{}'", v))?,
        };

        Ok(Self {
            api: ApiConfig {
                base_url: api_url,
                history_limit: history_limit.clamp(1, MAX_HISTORY_LIMIT),
                timeout: Duration::from_secs(timeout_secs.max(1)),
            },
            gateway: GatewayConfig::new(ws_url),
            sync: SyncConfig {
                reconcile_after_send,
            },
            token: non_empty("NEXCORD_TOKEN"),
            email: non_empty("NEXCORD_EMAIL"),
            password: non_empty("NEXCORD_PASSWORD"),
        })
    }

    /// Login credentials, when no token was configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
