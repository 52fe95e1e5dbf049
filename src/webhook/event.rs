//! Typed webhook events

use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type tags understood by [`PaymentEvent`]
pub mod event_types {
    pub const PAYMENT_SUCCESS: &str = "payment.success";
    pub const PAYMENT_FAILED: &str = "payment.failed";
    pub const PAYMENT_PENDING: &str = "payment.pending";
    pub const TRANSFER_COMPLETED: &str = "transfer.completed";
    pub const TRANSFER_FAILED: &str = "transfer.failed";
    pub const REFUND_PROCESSED: &str = "refund.processed";

    /// All tags with a dedicated variant
    pub fn all() -> Vec<&'static str> {
        vec![
            PAYMENT_SUCCESS,
            PAYMENT_FAILED,
            PAYMENT_PENDING,
            TRANSFER_COMPLETED,
            TRANSFER_FAILED,
            REFUND_PROCESSED,
        ]
    }
}

/// A provider's closed set of webhook events
///
/// `decode` is handed the tag already extracted from the envelope and the
/// raw body; implementations should fall back to an opaque variant for tags
/// they do not know rather than fail.
pub trait WebhookEvent: Sized + Send + Sync + 'static {
    /// Decode `body` as the event shape for `event_type`
    fn decode(event_type: &str, body: &[u8]) -> Result<Self>;

    /// Tag this event was decoded from
    fn event_type(&self) -> &str;
}

/// Payment state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Failure or pending reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Remaining provider-specific fields, including the event tag
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outbound transfer state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub transfer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Completed refund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefundDetails {
    pub refund_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Webhook events shared by the bank transfer, mobile money and card providers
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    PaymentSuccess(PaymentDetails),
    PaymentFailed(PaymentDetails),
    PaymentPending(PaymentDetails),
    TransferCompleted(TransferDetails),
    TransferFailed(TransferDetails),
    RefundProcessed(RefundDetails),
    /// Any tag without a dedicated variant, with the body kept as raw JSON
    Unknown {
        event_type: String,
        payload: Map<String, Value>,
    },
}

impl WebhookEvent for PaymentEvent {
    fn decode(event_type: &str, body: &[u8]) -> Result<Self> {
        use event_types::*;

        let event = match event_type {
            PAYMENT_SUCCESS => Self::PaymentSuccess(serde_json::from_slice(body)?),
            PAYMENT_FAILED => Self::PaymentFailed(serde_json::from_slice(body)?),
            PAYMENT_PENDING => Self::PaymentPending(serde_json::from_slice(body)?),
            TRANSFER_COMPLETED => Self::TransferCompleted(serde_json::from_slice(body)?),
            TRANSFER_FAILED => Self::TransferFailed(serde_json::from_slice(body)?),
            REFUND_PROCESSED => Self::RefundProcessed(serde_json::from_slice(body)?),
            other => Self::Unknown {
                event_type: other.to_string(),
                payload: serde_json::from_slice(body)?,
            },
        };
        Ok(event)
    }

    fn event_type(&self) -> &str {
        use event_types::*;

        match self {
            Self::PaymentSuccess(_) => PAYMENT_SUCCESS,
            Self::PaymentFailed(_) => PAYMENT_FAILED,
            Self::PaymentPending(_) => PAYMENT_PENDING,
            Self::TransferCompleted(_) => TRANSFER_COMPLETED,
            Self::TransferFailed(_) => TRANSFER_FAILED,
            Self::RefundProcessed(_) => REFUND_PROCESSED,
            Self::Unknown { event_type, .. } => event_type,
        }
    }
}

impl PaymentEvent {
    /// Payment or transfer identifier, when the event carries one
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::PaymentSuccess(p) | Self::PaymentFailed(p) | Self::PaymentPending(p) => {
                Some(p.transaction_id.as_str())
            }
            Self::TransferCompleted(t) | Self::TransferFailed(t) => Some(t.transfer_id.as_str()),
            Self::RefundProcessed(r) => r.transaction_id.as_deref(),
            Self::Unknown { payload, .. } => payload.get("transactionId").and_then(Value::as_str),
        }
    }
}
