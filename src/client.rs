//! Authenticated HTTP client for provider operations

use crate::auth::{TokenCache, TokenSource};
use crate::config::ClientConfig;
use crate::types::ErrorEnvelope;
use crate::{PaymentError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use url::Url;

/// Header carrying a caller-supplied idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// One row of a provider's operation table
///
/// Implement this for each provider operation and invoke it with
/// [`ProviderClient::call`]. A request type that serializes to `null`
/// (such as `()`) is sent without a body.
pub trait Endpoint {
    /// Request body type
    type Request: Serialize;
    /// Response body type
    type Response: DeserializeOwned;
    /// HTTP method of the operation
    const METHOD: Method;

    /// Path relative to the provider base URL
    fn path(&self) -> Cow<'_, str>;
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers sent with this call only
    pub headers: Vec<(String, String)>,
    /// Value of the `Idempotency-Key` header
    pub idempotency_key: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set an explicit idempotency key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Set a freshly generated idempotency key
    pub fn with_generated_idempotency_key(self) -> Self {
        self.with_idempotency_key(uuid::Uuid::new_v4().to_string())
    }
}

/// HTTP client for one provider account
///
/// Every call fetches a token from the client's [`TokenSource`] first, so the
/// credentials exchange happens transparently and at most once per token
/// lifetime. Cloning is cheap and clones share the token cache.
#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
    config: Arc<ClientConfig>,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("config", &self.config)
            .field("tokens", &"<token source>")
            .finish()
    }
}

impl ProviderClient {
    /// Create a client that authenticates with the client-credentials grant
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        let tokens = Arc::new(TokenCache::new(http.clone(), &config)?);
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens,
        })
    }

    /// Create a client with a custom token source
    pub fn with_token_source(config: ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a valid bearer token
    pub async fn token(&self) -> Result<String> {
        self.tokens.token().await
    }

    /// Invoke a typed endpoint
    pub async fn call<E: Endpoint>(&self, endpoint: &E, request: &E::Request) -> Result<E::Response> {
        self.execute(E::METHOD, &endpoint.path(), Some(request)).await
    }

    /// Invoke a typed endpoint with per-call options
    pub async fn call_with<E: Endpoint>(
        &self,
        endpoint: &E,
        request: &E::Request,
        options: &RequestOptions,
    ) -> Result<E::Response> {
        self.execute_with(E::METHOD, &endpoint.path(), Some(request), options)
            .await
    }

    /// `GET` a path and decode the response
    pub async fn get<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
        self.execute::<(), Resp>(Method::GET, path, None).await
    }

    /// `POST` a JSON body and decode the response
    pub async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.execute(Method::POST, path, Some(body)).await
    }

    /// Execute an authenticated JSON call
    pub async fn execute<Req, Resp>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.execute_with(method, path, body, &RequestOptions::default())
            .await
    }

    /// Execute an authenticated JSON call with per-call options
    ///
    /// Each call is sent once by default. A configured
    /// [`RetryPolicy`](crate::config::RetryPolicy) may replay `GET` calls
    /// after transport failures, and after a 401 with a fresh token;
    /// other methods are never replayed.
    pub async fn execute_with<Req, Resp>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
        options: &RequestOptions,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.config.url_for(path)?;
        let payload = match body {
            Some(body) => {
                let bytes = serde_json::to_vec(body)?;
                (bytes.as_slice() != b"null").then_some(bytes)
            }
            None => None,
        };

        let policy = self.config.retry_policy;
        let idempotent = method == Method::GET;
        let mut retries_left = if idempotent { policy.max_retries } else { 0 };
        let mut may_reauthenticate = idempotent && policy.reauthenticate;

        loop {
            let token = self.tokens.token().await?;
            let result = self
                .send_once(&method, &url, payload.as_deref(), &token, options)
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.http_status() == Some(401) && may_reauthenticate => {
                    tracing::debug!(%method, path, "Access token rejected, re-authenticating");
                    may_reauthenticate = false;
                    self.tokens.invalidate(&token).await;
                }
                Err(err) if err.is_transient() && retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!(%method, path, error = %err, retries_left, "Retrying request");
                    tokio::time::sleep(policy.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<Resp: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&[u8]>,
        token: &str,
        options: &RequestOptions,
    ) -> Result<Resp> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token)
            .header(ACCEPT, "application/json");

        if let Some(api_key) = &self.config.credentials.api_key {
            request = request.header(self.config.api_key_header.as_str(), api_key.as_str());
        }
        if let Some(key) = &options.idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_vec());
        }

        tracing::debug!(%method, url = %url, "Sending provider request");

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            decode_success(&body)
        } else {
            Err(error_from_response(status, &body))
        }
    }
}

fn build_http_client(config: &ClientConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| PaymentError::config(format!("Failed to create HTTP client: {}", e)))
}

/// Decode a success body; an empty body decodes as `null`
fn decode_success<Resp: DeserializeOwned>(body: &[u8]) -> Result<Resp> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Map a failure status and body to an API or transport error
fn error_from_response(status: StatusCode, body: &[u8]) -> PaymentError {
    match ErrorEnvelope::from_body(body) {
        Some(envelope) => PaymentError::api(envelope.code, envelope.message, status.as_u16()),
        None => PaymentError::transport(
            Some(status.as_u16()),
            String::from_utf8_lossy(body).into_owned(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::config::Credentials;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ack {
        ok: bool,
    }

    #[test]
    fn test_decode_success_empty_body() {
        assert!(decode_success::<()>(b"").is_ok());
        let none: Option<Ack> = decode_success(b"  ").unwrap();
        assert!(none.is_none());
        let ack: Ack = decode_success(br#"{"ok":true}"#).unwrap();
        assert_eq!(ack, Ack { ok: true });
        assert!(matches!(
            decode_success::<Ack>(br#"{"ok":"yes"}"#),
            Err(PaymentError::Decode(_))
        ));
    }

    #[test]
    fn test_error_from_response() {
        let err = error_from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"code":"INVALID_ACCOUNT","message":"Account not found"}"#,
        );
        match err {
            PaymentError::Api {
                code,
                message,
                status,
            } => {
                assert_eq!(code, "INVALID_ACCOUNT");
                assert_eq!(message, "Account not found");
                assert_eq!(status, 422);
            }
            other => panic!("expected API error, got {other:?}"),
        }

        let err = error_from_response(StatusCode::BAD_GATEWAY, b"upstream unavailable");
        match err {
            PaymentError::Transport { status, body } => {
                assert_eq!(status, Some(502));
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_request_options() {
        let options = RequestOptions::new()
            .with_header("X-Country", "KE")
            .with_generated_idempotency_key();
        assert_eq!(options.headers, vec![("X-Country".to_string(), "KE".to_string())]);
        let key = options.idempotency_key.unwrap();
        assert!(uuid::Uuid::parse_str(&key).is_ok());
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ClientConfig::new(Credentials::new("", "secret"), "https://example.com");
        assert!(matches!(
            ProviderClient::new(config),
            Err(PaymentError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_with_static_token() {
        let config = ClientConfig::new(Credentials::new("id", "secret"), "https://example.com");
        let client =
            ProviderClient::with_token_source(config, Arc::new(StaticToken::new("abc"))).unwrap();
        assert_eq!(client.token().await.unwrap(), "abc");
        assert_eq!(client.config().base_url, "https://example.com");
    }
}
