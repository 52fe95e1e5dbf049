//! Error types for the payments SDK

use http::StatusCode;
use thiserror::Error;

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Main error type for SDK operations
#[derive(Error, Debug)]
pub enum PaymentError {
    /// The client-credentials exchange was rejected or failed
    #[error("Authentication failed (HTTP {status}): {code}: {message}")]
    Authentication {
        status: u16,
        code: String,
        message: String,
    },

    /// The provider answered with a decodable error envelope
    #[error("API error (HTTP {status}): {code}: {message}")]
    Api {
        code: String,
        message: String,
        status: u16,
    },

    /// Network failure, timeout, or an error body that could not be decoded
    #[error("Transport error{}: {body}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, body: String },

    /// Webhook signature missing, empty, or mismatched
    #[error("Invalid webhook signature: {message}")]
    Signature { message: String },

    /// JSON serialization/deserialization error
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A registered webhook handler reported failure
    #[error("Webhook handler for '{event_type}' failed: {message}")]
    Handler { event_type: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PaymentError {
    /// Create an authentication error
    pub fn authentication(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an API error from a decoded provider envelope
    pub fn api(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    /// Create a transport error
    pub fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }

    /// Create a signature error
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }

    /// Create a handler error
    pub fn handler(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            event_type: event_type.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status of the failed exchange, when there was one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received
    ///
    /// Only these are candidates for a retry of an idempotent request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { status: None, .. })
            || matches!(self, Self::Transport { status: Some(s), .. } if *s >= 500)
    }

    /// Status a webhook endpoint should answer with for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Signature { .. } => StatusCode::UNAUTHORIZED,
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let body = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Self::Transport { status, body }
    }
}
