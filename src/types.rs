//! Wire types shared by every provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// OAuth2 grant type used for every token exchange
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Client-credentials token request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
}

impl TokenRequest {
    /// Create a client-credentials request
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: CLIENT_CREDENTIALS_GRANT.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Bearer token value
    pub access_token: String,
    /// Token type, normally `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime in seconds; some providers send it as a string
    #[serde(deserialize_with = "deserialize_seconds")]
    pub expires_in: u64,
}

fn deserialize_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid expires_in: {s:?}"))),
    }
}

/// Token held by the authenticator
///
/// Replaced as a whole on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// Bearer token value
    pub value: String,
    /// When the exchange completed
    pub obtained_at: DateTime<Utc>,
    /// When the token stops being handed out
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Whether the token can still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whether the token can still be used
    pub fn is_valid_now(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Provider error envelope
///
/// Providers disagree on field names, so [`ErrorEnvelope::from_body`] looks the
/// code and message up under the common spellings, including envelopes nested
/// under an `error` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

const CODE_FIELDS: &[&str] = &["code", "errorCode", "error_code", "error"];
const MESSAGE_FIELDS: &[&str] = &[
    "message",
    "errorMessage",
    "error_message",
    "error_description",
    "description",
];

impl ErrorEnvelope {
    /// Decode an error body, or `None` if it is not a recognisable envelope
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        let object = match value.get("error") {
            Some(inner @ Value::Object(_)) => inner,
            _ => &value,
        };
        let object = object.as_object()?;

        let code = first_scalar(object, CODE_FIELDS);
        let message = first_scalar(object, MESSAGE_FIELDS);
        if code.is_none() && message.is_none() {
            return None;
        }

        Some(Self {
            code: code.unwrap_or_default(),
            message: message.unwrap_or_default(),
        })
    }
}

fn first_scalar(object: &serde_json::Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match object.get(*field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
