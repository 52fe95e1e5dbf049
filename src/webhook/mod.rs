//! Inbound webhook verification and dispatch
//!
//! A delivery goes through three steps, stopping at the first failure:
//!
//! 1. the HMAC-SHA256 signature header is checked against the exact raw body
//!    ([`signature`]);
//! 2. the event type tag is read and the body decoded into the matching
//!    [`WebhookEvent`] variant ([`event`]);
//! 3. the event is handed to the handler registered for its tag
//!    ([`dispatcher`]). Tags without a handler are acknowledged untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use payments_sdk::webhook::{handle_webhook, EventHandler, HandlerError, PaymentEvent, WebhookDispatcher};
//!
//! struct MarkOrderPaid;
//!
//! #[async_trait::async_trait]
//! impl EventHandler<PaymentEvent> for MarkOrderPaid {
//!     async fn handle(&self, event: &PaymentEvent) -> Result<(), HandlerError> {
//!         // update the order
//!         Ok(())
//!     }
//! }
//!
//! let dispatcher = WebhookDispatcher::<PaymentEvent>::new().on("payment.success", MarkOrderPaid);
//! let ack = handle_webhook(&body, signature_header, secret, &dispatcher).await?;
//! ```

pub mod dispatcher;
pub mod event;
pub mod signature;

pub use dispatcher::{
    handle_webhook, webhook_reply, EventHandler, HandlerError, WebhookAck, WebhookDispatcher,
    WebhookEndpoint, WebhookEnvelope, DEFAULT_EVENT_TYPE_FIELD, DEFAULT_SIGNATURE_HEADER,
};
pub use event::{
    event_types, PaymentDetails, PaymentEvent, RefundDetails, TransferDetails, WebhookEvent,
};
pub use signature::{sign_payload, verify_signature, SignatureEncoding, SignatureScheme};
