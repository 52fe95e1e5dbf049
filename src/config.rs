//! Client configuration
//!
//! Everything a provider client needs is supplied here once, validated when the
//! client is built, and never changed afterwards.

use crate::{PaymentError, Result};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default HTTP timeout for every outbound call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default margin subtracted from a token's lifetime
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// Default path of the client-credentials token endpoint
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// Default header carrying the optional API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Client identifier/secret pair plus an optional API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Static API key some providers require on every call
    pub api_key: Option<String>,
}

impl Credentials {
    /// Create credentials without an API key
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_key: None,
        }
    }

    /// Attach an API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Provider environment selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Get the environment identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" | "staging" => Ok(Environment::Sandbox),
            "production" | "prod" | "live" => Ok(Environment::Production),
            other => Err(PaymentError::config(format!("Unknown environment: {other}"))),
        }
    }
}

/// Base URLs a provider publishes for each environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUrls {
    pub sandbox: String,
    pub production: String,
}

impl ProviderUrls {
    pub fn new(sandbox: impl Into<String>, production: impl Into<String>) -> Self {
        Self {
            sandbox: sandbox.into(),
            production: production.into(),
        }
    }

    /// Base URL for an environment
    pub fn for_environment(&self, environment: Environment) -> &str {
        match environment {
            Environment::Sandbox => &self.sandbox,
            Environment::Production => &self.production,
        }
    }
}

/// How the client-credentials exchange is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenEncoding {
    /// `POST` with a JSON body `{grant_type, client_id, client_secret}`
    #[default]
    Json,
    /// `POST` with the same fields form-encoded
    Form,
    /// `GET ?grant_type=client_credentials` with HTTP Basic credentials
    BasicAuth,
}

/// Opt-in retries for idempotent requests
///
/// Only `GET` requests are ever replayed: those that fail before a usable
/// response arrives, and, with `reauthenticate` set, those answered with 401.
/// Payment-creating calls are never replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Fetch a new token and replay a `GET` once when it is answered with 401
    pub reauthenticate: bool,
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            reauthenticate: false,
        }
    }

    /// Retry idempotent reads up to `max_retries` times
    pub fn idempotent_reads(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            reauthenticate: false,
        }
    }

    /// Also replay a `GET` once with a fresh token after a 401
    pub fn with_reauthentication(mut self) -> Self {
        self.reauthenticate = true;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Configuration for a provider client
#[derive(Clone)]
pub struct ClientConfig {
    /// Client credentials
    pub credentials: Credentials,
    /// Selected environment
    pub environment: Environment,
    /// Base URL every path is resolved against
    pub base_url: String,
    /// Path of the token endpoint
    pub token_path: String,
    /// Wire shape of the token exchange
    pub token_encoding: TokenEncoding,
    /// Header the API key is sent in
    pub api_key_header: String,
    /// Shared secret for inbound webhook signatures
    pub webhook_secret: Option<String>,
    /// Timeout applied to every HTTP call
    pub timeout: Duration,
    /// Margin subtracted from `expires_in`
    pub refresh_buffer: Duration,
    /// Retry behaviour for idempotent reads
    pub retry_policy: RetryPolicy,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("credentials", &self.credentials)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("token_path", &self.token_path)
            .field("token_encoding", &self.token_encoding)
            .field("api_key_header", &self.api_key_header)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config against an explicit base URL
    pub fn new(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            credentials,
            environment: Environment::default(),
            base_url: base_url.into(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            token_encoding: TokenEncoding::default(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            webhook_secret: None,
            timeout: DEFAULT_TIMEOUT,
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            retry_policy: RetryPolicy::default(),
            user_agent: format!("payments-sdk/{}", crate::VERSION),
        }
    }

    /// Create a config for one of a provider's published environments
    pub fn for_environment(
        credentials: Credentials,
        urls: &ProviderUrls,
        environment: Environment,
    ) -> Self {
        let mut config = Self::new(credentials, urls.for_environment(environment));
        config.environment = environment;
        config
    }

    /// Load a config from `{prefix}_*` environment variables
    ///
    /// `{prefix}_BASE_URL` wins over the `{prefix}_SANDBOX_URL` /
    /// `{prefix}_PRODUCTION_URL` pair selected by `{prefix}_ENVIRONMENT`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let var = |name: &str| env::var(format!("{prefix}_{name}")).ok();
        let required = |name: &str| {
            var(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                PaymentError::config(format!("Missing required variable {prefix}_{name}"))
            })
        };

        let mut credentials = Credentials::new(required("CLIENT_ID")?, required("CLIENT_SECRET")?);
        credentials.api_key = var("API_KEY").filter(|v| !v.is_empty());

        let environment = match var("ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };

        let mut config = match var("BASE_URL") {
            Some(base_url) => Self::new(credentials, base_url),
            None => {
                let urls = ProviderUrls::new(required("SANDBOX_URL")?, required("PRODUCTION_URL")?);
                Self::for_environment(credentials, &urls, environment)
            }
        };
        config.environment = environment;

        if let Some(path) = var("TOKEN_PATH") {
            config.token_path = path;
        }
        config.webhook_secret = var("WEBHOOK_SECRET").filter(|v| !v.is_empty());
        if let Some(secs) = var("TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PaymentError::config(format!("{prefix}_TIMEOUT_SECS must be a whole number"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validate the client configuration
    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.is_empty() {
            return Err(PaymentError::config("Client ID cannot be empty"));
        }
        if self.credentials.client_secret.is_empty() {
            return Err(PaymentError::config("Client secret cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(PaymentError::config(
                "Base URL must start with http:// or https://",
            ));
        }
        Url::parse(&self.base_url)
            .map_err(|e| PaymentError::config(format!("Invalid base URL: {e}")))?;
        if self.timeout.is_zero() {
            return Err(PaymentError::config("Timeout must be greater than zero"));
        }
        if self.api_key_header.is_empty() {
            return Err(PaymentError::config("API key header name cannot be empty"));
        }
        Ok(())
    }

    /// Resolve a provider path against the base URL
    ///
    /// Paths are appended to the base URL rather than joined, so a base of
    /// `https://host/v1` and a path of `/transfers` give `https://host/v1/transfers`.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| PaymentError::config(format!("Invalid URL for path '{path}': {e}")))
    }

    /// Set the environment and the matching base URL
    pub fn with_environment(mut self, urls: &ProviderUrls, environment: Environment) -> Self {
        self.environment = environment;
        self.base_url = urls.for_environment(environment).to_string();
        self
    }

    /// Set the token endpoint path
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set the token exchange encoding
    pub fn with_token_encoding(mut self, encoding: TokenEncoding) -> Self {
        self.token_encoding = encoding;
        self
    }

    /// Set the header the API key is sent in
    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    /// Set the webhook shared secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the token refresh buffer
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Set the retry policy for idempotent reads
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the `User-Agent` header value
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig::new(
            Credentials::new("client-id", "client-secret"),
            "https://sandbox.example.com/v1",
        )
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_buffer, Duration::from_secs(60));
        assert_eq!(config.token_path, "/oauth/token");
        assert_eq!(config.token_encoding, TokenEncoding::Json);
        assert_eq!(config.retry_policy, RetryPolicy::none());
        assert!(!config.retry_policy.reauthenticate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = test_config();
        config.credentials.client_secret.clear();
        assert!(matches!(config.validate(), Err(PaymentError::Config { .. })));

        let config = test_config().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_for_appends_to_base_path() {
        let config = test_config();
        assert_eq!(
            config.url_for("/transfers").unwrap().as_str(),
            "https://sandbox.example.com/v1/transfers"
        );
        assert_eq!(
            config.url_for("oauth/v1/generate?grant_type=client_credentials").unwrap().as_str(),
            "https://sandbox.example.com/v1/oauth/v1/generate?grant_type=client_credentials"
        );
    }

    #[test]
    fn test_environment_selection() {
        let urls = ProviderUrls::new("https://sandbox.example.com", "https://api.example.com");
        let config = ClientConfig::for_environment(
            Credentials::new("id", "secret"),
            &urls,
            Environment::Production,
        );
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.environment, Environment::Production);

        let config = config.with_environment(&urls, Environment::Sandbox);
        assert_eq!(config.base_url, "https://sandbox.example.com");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("live".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert!("mars".parse::<Environment>().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new(
            Credentials::new("client-id", "super-secret").with_api_key("key-123"),
            "https://sandbox.example.com",
        )
        .with_webhook_secret("whsec");
        let debug = format!("{config:?}");
        assert!(debug.contains("client-id"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("whsec"));
    }

    #[test]
    fn test_from_env() {
        env::set_var("PSDK_CFG_TEST_CLIENT_ID", "env-id");
        env::set_var("PSDK_CFG_TEST_CLIENT_SECRET", "env-secret");
        env::set_var("PSDK_CFG_TEST_ENVIRONMENT", "production");
        env::set_var("PSDK_CFG_TEST_SANDBOX_URL", "https://sandbox.example.com");
        env::set_var("PSDK_CFG_TEST_PRODUCTION_URL", "https://api.example.com");
        env::set_var("PSDK_CFG_TEST_TIMEOUT_SECS", "5");

        let config = ClientConfig::from_env("PSDK_CFG_TEST").unwrap();
        assert_eq!(config.credentials.client_id, "env-id");
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_from_env_missing_credentials() {
        let err = ClientConfig::from_env("PSDK_CFG_MISSING").unwrap_err();
        assert!(err.to_string().contains("PSDK_CFG_MISSING_CLIENT_ID"));
    }
}
