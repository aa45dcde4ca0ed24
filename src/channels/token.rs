//! OAuth2 client-credentials tokens for the Bot Framework connector.

use std::time::{Duration, Instant};

use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::AppCredentials;
use crate::error::ReplyDeliveryError;

/// Scope requested for connector calls.
pub const CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Acquires and caches bearer tokens for one bot identity.
pub struct TokenProvider {
    client: reqwest::Client,
    credentials: AppCredentials,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(client: reqwest::Client, credentials: AppCredentials) -> Self {
        let token_url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            credentials.tenant_id
        );
        Self {
            client,
            credentials,
            token_url,
            cached: Mutex::new(None),
        }
    }

    /// Override the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Return a valid token, fetching a new one when the cache is stale.
    ///
    /// Concurrent callers queue on the cache lock while a fetch is in flight,
    /// so the client's request timeout bounds how long any turn waits here.
    pub async fn token(&self) -> Result<String, ReplyDeliveryError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!("Connector token due for refresh");
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, ReplyDeliveryError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.app_id.as_str()),
            ("client_secret", self.credentials.app_password.expose_secret()),
            ("scope", CONNECTOR_SCOPE),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|source| ReplyDeliveryError::Transport {
                url: self.token_url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReplyDeliveryError::Token {
                reason: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| ReplyDeliveryError::Token {
            reason: format!("invalid token response: {e}"),
        })?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        info!(expires_in_secs = lifetime.as_secs(), "Acquired connector token");

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}
