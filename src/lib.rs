//! # payments-sdk
//!
//! Shared core of the payment provider client SDKs: bank transfer, mobile
//! money and card gateway APIs all authenticate with an OAuth2
//! client-credentials grant, exchange JSON over HTTPS and push signed webhooks.
//!
//! - [`auth::TokenCache`] obtains bearer tokens and caches them until shortly
//!   before they expire.
//! - [`client::ProviderClient`] attaches a valid token to every typed call and
//!   maps provider failures onto [`PaymentError`].
//! - [`webhook`] verifies HMAC-SHA256 webhook signatures and routes typed
//!   events to one handler per event type.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod webhook;

// Re-exports for convenience
pub use auth::{StaticToken, TokenCache, TokenSource};
pub use client::{Endpoint, ProviderClient, RequestOptions};
pub use config::{ClientConfig, Credentials, Environment, ProviderUrls, RetryPolicy, TokenEncoding};
pub use error::{PaymentError, Result};
pub use webhook::{handle_webhook, PaymentEvent, WebhookAck, WebhookDispatcher, WebhookEndpoint};

// Feature-gated framework support
#[cfg(feature = "axum")]
pub mod axum;

#[cfg(feature = "actix-web")]
pub mod actix_web;

#[cfg(feature = "warp")]
pub mod warp;

/// Current version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
