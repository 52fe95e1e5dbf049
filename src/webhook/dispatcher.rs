//! Verify, decode and route inbound webhooks

use super::event::{PaymentEvent, WebhookEvent};
use super::signature::SignatureScheme;
use crate::config::ClientConfig;
use crate::{PaymentError, Result};
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Default JSON field holding the event type tag
pub const DEFAULT_EVENT_TYPE_FIELD: &str = "eventType";

/// Default request header carrying the signature
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Signature";

/// Error type handlers may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler for one event type
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Process a verified, decoded event
    async fn handle(&self, event: &E) -> std::result::Result<(), HandlerError>;
}

/// Event tag plus the raw body it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEnvelope<'a> {
    pub event_type: String,
    pub raw_payload: &'a [u8],
}

impl<'a> WebhookEnvelope<'a> {
    /// Read the tag stored under `field`
    pub fn parse(raw_payload: &'a [u8], field: &str) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw_payload)?;
        let event_type = match value.get(field) {
            Some(Value::String(tag)) if !tag.is_empty() => tag.clone(),
            _ => {
                return Err(PaymentError::Decode(serde::de::Error::custom(format!(
                    "webhook body has no string field '{field}'"
                ))))
            }
        };
        Ok(Self {
            event_type,
            raw_payload,
        })
    }
}

/// Outcome of a delivery that should be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAck {
    /// Status to answer the provider with
    pub status: StatusCode,
    /// Tag of the delivered event
    pub event_type: String,
    /// Whether a registered handler ran
    pub handled: bool,
}

/// Routes verified webhook events to one handler per event type
///
/// Registering a second handler for the same tag replaces the first.
pub struct WebhookDispatcher<E = PaymentEvent> {
    handlers: HashMap<String, Arc<dyn EventHandler<E>>>,
    scheme: SignatureScheme,
    event_type_field: String,
}

impl<E> std::fmt::Debug for WebhookDispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut event_types: Vec<&String> = self.handlers.keys().collect();
        event_types.sort();
        f.debug_struct("WebhookDispatcher")
            .field("event_types", &event_types)
            .field("scheme", &self.scheme)
            .field("event_type_field", &self.event_type_field)
            .finish()
    }
}

impl<E: WebhookEvent> Default for WebhookDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: WebhookEvent> WebhookDispatcher<E> {
    /// Create a dispatcher for hex signatures and an `eventType` tag
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            scheme: SignatureScheme::default(),
            event_type_field: DEFAULT_EVENT_TYPE_FIELD.to_string(),
        }
    }

    /// Set the signature header format
    pub fn with_signature_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the JSON field holding the event tag
    pub fn with_event_type_field(mut self, field: impl Into<String>) -> Self {
        self.event_type_field = field.into();
        self
    }

    /// Register `handler` for `event_type`, returning the handler it replaced
    pub fn register<H>(
        &mut self,
        event_type: impl Into<String>,
        handler: H,
    ) -> Option<Arc<dyn EventHandler<E>>>
    where
        H: EventHandler<E> + 'static,
    {
        self.handlers.insert(event_type.into(), Arc::new(handler))
    }

    /// Builder form of [`register`](Self::register)
    pub fn on<H>(mut self, event_type: impl Into<String>, handler: H) -> Self
    where
        H: EventHandler<E> + 'static,
    {
        self.register(event_type, handler);
        self
    }

    /// Whether a handler is registered for `event_type`
    pub fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Signature format this dispatcher verifies
    pub fn signature_scheme(&self) -> &SignatureScheme {
        &self.scheme
    }

    /// Verify, decode and route one delivery
    pub async fn handle(
        &self,
        raw_body: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<WebhookAck> {
        if let Err(err) = self.scheme.verify(raw_body, signature, secret.as_bytes()) {
            tracing::warn!(error = %err, "Rejected webhook delivery");
            return Err(err);
        }
        self.dispatch(raw_body).await
    }

    /// Decode and route a body whose signature was already checked
    pub async fn dispatch(&self, raw_body: &[u8]) -> Result<WebhookAck> {
        let envelope = WebhookEnvelope::parse(raw_body, &self.event_type_field)?;
        let event = E::decode(&envelope.event_type, envelope.raw_payload)?;

        let Some(handler) = self.handlers.get(&envelope.event_type) else {
            tracing::debug!(
                event_type = %envelope.event_type,
                "No handler registered, acknowledging"
            );
            return Ok(WebhookAck {
                status: StatusCode::OK,
                event_type: envelope.event_type,
                handled: false,
            });
        };

        if let Err(err) = handler.handle(&event).await {
            tracing::error!(
                event_type = %envelope.event_type,
                error = %err,
                "Webhook handler failed"
            );
            return Err(PaymentError::handler(envelope.event_type, err.to_string()));
        }

        tracing::info!(event_type = %envelope.event_type, "Webhook event handled");
        Ok(WebhookAck {
            status: StatusCode::OK,
            event_type: envelope.event_type,
            handled: true,
        })
    }
}

/// Verify an inbound webhook and route it to its handler
///
/// This is the whole contract an HTTP layer needs: answer with
/// `ack.status` on success and [`PaymentError::status_code`] on failure.
pub async fn handle_webhook<E: WebhookEvent>(
    raw_body: &[u8],
    signature: &str,
    secret: &str,
    dispatcher: &WebhookDispatcher<E>,
) -> Result<WebhookAck> {
    dispatcher.handle(raw_body, signature, secret).await
}

/// Status and JSON body an HTTP adapter answers a delivery with
///
/// Server-side failures are reported without detail so handler internals do
/// not leak to the provider.
pub fn webhook_reply(result: &Result<WebhookAck>) -> (StatusCode, Value) {
    match result {
        Ok(ack) => (
            ack.status,
            serde_json::json!({ "received": true, "eventType": ack.event_type }),
        ),
        Err(err) => {
            let status = err.status_code();
            let message = if status.is_server_error() {
                "webhook processing failed".to_string()
            } else {
                err.to_string()
            };
            (status, serde_json::json!({ "error": message }))
        }
    }
}

/// A dispatcher bundled with the secret and header name an HTTP route needs
pub struct WebhookEndpoint<E = PaymentEvent> {
    dispatcher: Arc<WebhookDispatcher<E>>,
    secret: String,
    signature_header: String,
}

impl<E> Clone for WebhookEndpoint<E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            secret: self.secret.clone(),
            signature_header: self.signature_header.clone(),
        }
    }
}

impl<E> std::fmt::Debug for WebhookEndpoint<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookEndpoint")
            .field("dispatcher", &self.dispatcher)
            .field("secret", &"<redacted>")
            .field("signature_header", &self.signature_header)
            .finish()
    }
}

impl<E: WebhookEvent> WebhookEndpoint<E> {
    /// Create an endpoint reading the signature from `X-Signature`
    pub fn new(dispatcher: WebhookDispatcher<E>, secret: impl Into<String>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            secret: secret.into(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
        }
    }

    /// Create an endpoint using the webhook secret of a client config
    pub fn from_config(config: &ClientConfig, dispatcher: WebhookDispatcher<E>) -> Result<Self> {
        match config.webhook_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(Self::new(dispatcher, secret)),
            _ => Err(PaymentError::config("Webhook secret is not configured")),
        }
    }

    /// Read the signature from a different header
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    /// Name of the signature header
    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    /// Handle one delivery; a missing header is passed as an empty signature
    pub async fn handle(&self, raw_body: &[u8], signature: Option<&str>) -> Result<WebhookAck> {
        handle_webhook(raw_body, signature.unwrap_or(""), &self.secret, &self.dispatcher).await
    }
}
