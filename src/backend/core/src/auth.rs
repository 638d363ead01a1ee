//! Cached client-credentials auth token.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Process-wide bearer-token cache with single-flight refresh: the mutex is
/// held across the token request, so concurrent callers wait for the
/// in-flight refresh instead of stampeding the token endpoint.
pub struct TokenCache {
    client: reqwest::Client,
    config: AuthConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            cached: Mutex::new(None),
        }
    }

    /// Current token, refreshed when missing or within the refresh margin of
    /// its expiry.
    pub async fn bearer_token(&self) -> Result<String> {
        if self.config.token_url.is_empty() {
            return Err(Error::Auth("token URL is not configured".to_string()));
        }

        let mut cached = self.cached.lock().await;
        let margin = Duration::seconds(self.config.refresh_margin_secs as i64);
        if let Some(token) = cached.as_ref() {
            if Utc::now() + margin < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let refreshed = self.request_token().await?;
        let token = refreshed.token.clone();
        *cached = Some(refreshed);
        Ok(token)
    }

    /// Drops the cached token, forcing a refresh on the next call. Used when
    /// a downstream service rejects the token before its recorded expiry.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let response = self
            .client
            .post(&self.config.token_url)
            .json(&serde_json::json!({
                "grant_type": self.config.grant_type,
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: TokenResponse = response.json().await?;
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in as i64),
        })
    }
}
