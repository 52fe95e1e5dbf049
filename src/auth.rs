//! Client-credentials token acquisition and caching
//!
//! [`TokenCache`] hands out a bearer token for every outbound call. A cached
//! token is served under a shared read lock. When it is missing or expired the
//! caller takes the write lock, checks again, and only then talks to the token
//! endpoint, so a burst of callers on a cold cache causes a single exchange.

use crate::config::{ClientConfig, Credentials, TokenEncoding};
use crate::types::{
    CachedToken, ErrorEnvelope, TokenRequest, TokenResponse, CLIENT_CREDENTIALS_GRANT,
};
use crate::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

/// Source of bearer tokens for the request executor
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token that is valid right now
    async fn token(&self) -> Result<String>;

    /// Forget `rejected` so the next call fetches a new token
    ///
    /// A token that was already replaced by a newer one is left alone.
    async fn invalidate(&self, rejected: &str);
}

/// Caching client-credentials authenticator
pub struct TokenCache {
    http: Client,
    token_url: Url,
    credentials: Credentials,
    encoding: TokenEncoding,
    refresh_buffer: Duration,
    current: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("token_url", &self.token_url.as_str())
            .field("credentials", &self.credentials)
            .field("encoding", &self.encoding)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}

impl TokenCache {
    /// Create a token cache sharing an existing HTTP client
    pub fn new(http: Client, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http,
            token_url: config.url_for(&config.token_path)?,
            credentials: config.credentials.clone(),
            encoding: config.token_encoding,
            refresh_buffer: config.refresh_buffer,
            current: RwLock::new(None),
        })
    }

    /// Create a token cache with its own HTTP client
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PaymentError::config(format!("Failed to create HTTP client: {}", e)))?;
        Self::new(http, config)
    }

    /// Return a valid bearer token, exchanging credentials if needed
    pub async fn get_token(&self) -> Result<String> {
        if let Some(token) = self.current.read().await.as_ref() {
            if token.is_valid_now() {
                tracing::debug!(expires_at = %token.expires_at, "Using cached access token");
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.current.write().await;

        // Another caller may have refreshed while this one waited for the lock
        if let Some(token) = slot.as_ref() {
            if token.is_valid_now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    /// Snapshot of the currently cached token
    pub async fn cached(&self) -> Option<CachedToken> {
        self.current.read().await.clone()
    }

    /// Drop the cached token
    pub async fn clear(&self) {
        *self.current.write().await = None;
    }

    /// Drop the cached token only if it is still `rejected`
    pub async fn clear_if(&self, rejected: &str) -> bool {
        let mut slot = self.current.write().await;
        match slot.as_ref() {
            Some(token) if token.value == rejected => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Perform the client-credentials exchange
    async fn exchange(&self) -> Result<CachedToken> {
        let request = match self.encoding {
            TokenEncoding::Json => self.http.post(self.token_url.clone()).json(&self.token_request()),
            TokenEncoding::Form => self.http.post(self.token_url.clone()).form(&self.token_request()),
            TokenEncoding::BasicAuth => self
                .http
                .get(self.token_url.clone())
                .query(&[("grant_type", CLIENT_CREDENTIALS_GRANT)])
                .basic_auth(
                    &self.credentials.client_id,
                    Some(&self.credentials.client_secret),
                ),
        };

        tracing::debug!(url = %self.token_url, encoding = ?self.encoding, "Requesting access token");

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = match ErrorEnvelope::from_body(&body) {
                Some(envelope) => {
                    PaymentError::authentication(status.as_u16(), envelope.code, envelope.message)
                }
                None => PaymentError::authentication(
                    status.as_u16(),
                    "",
                    String::from_utf8_lossy(&body).into_owned(),
                ),
            };
            tracing::warn!(status = status.as_u16(), error = %err, "Token exchange rejected");
            return Err(err);
        }

        let token_response: TokenResponse = serde_json::from_slice(&body)?;
        let token = cached_token_from(token_response, self.refresh_buffer, Utc::now()).map_err(
            |message| {
                PaymentError::authentication(status.as_u16(), "invalid_token_response", message)
            },
        )?;

        tracing::info!(expires_at = %token.expires_at, "Obtained new access token");
        Ok(token)
    }

    fn token_request(&self) -> TokenRequest {
        TokenRequest::client_credentials(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
        )
    }
}

#[async_trait]
impl TokenSource for TokenCache {
    async fn token(&self) -> Result<String> {
        self.get_token().await
    }

    async fn invalidate(&self, rejected: &str) {
        if self.clear_if(rejected).await {
            tracing::debug!("Dropped rejected access token");
        }
    }
}

/// Fixed token for providers that issue long-lived keys, and for tests
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }

    async fn invalidate(&self, _rejected: &str) {}
}

/// Turn a token response into a cache entry
///
/// The refresh buffer is capped at half the reported lifetime so the entry
/// always expires strictly after it was obtained.
fn cached_token_from(
    response: TokenResponse,
    refresh_buffer: Duration,
    now: DateTime<Utc>,
) -> std::result::Result<CachedToken, String> {
    if response.access_token.is_empty() {
        return Err("token endpoint returned an empty access_token".to_string());
    }
    if response.expires_in == 0 {
        return Err("token endpoint returned expires_in = 0".to_string());
    }

    let expires_in = response.expires_in;
    let out_of_range = || format!("token endpoint returned out-of-range expires_in = {expires_in}");
    let lifetime = i64::try_from(expires_in)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(out_of_range)?;
    let buffer = chrono::Duration::from_std(refresh_buffer)
        .unwrap_or(lifetime)
        .min(lifetime / 2);
    let expires_at = now
        .checked_add_signed(lifetime)
        .and_then(|t| t.checked_sub_signed(buffer))
        .ok_or_else(out_of_range)?;

    Ok(CachedToken {
        value: response.access_token,
        obtained_at: now,
        expires_at,
    })
}
