//! Example Axum server receiving signed provider webhooks
//!
//! ```bash
//! PAYMENTS_WEBHOOK_SECRET=s3cr3t cargo run --example axum_webhook_server
//! ```

use async_trait::async_trait;
use axum::{response::Json, routing::get, Router};
use payments_sdk::{
    axum::webhook_router,
    webhook::{EventHandler, HandlerError},
    PaymentEvent, WebhookDispatcher, WebhookEndpoint,
};
use serde_json::json;

/// Marks orders as paid
struct MarkOrderPaid;

#[async_trait]
impl EventHandler<PaymentEvent> for MarkOrderPaid {
    async fn handle(&self, event: &PaymentEvent) -> Result<(), HandlerError> {
        if let PaymentEvent::PaymentSuccess(payment) = event {
            tracing::info!(
                transaction_id = %payment.transaction_id,
                amount = ?payment.amount,
                "Order paid"
            );
        }
        Ok(())
    }
}

/// Flags failed payouts for a retry by an operator
struct FlagFailedTransfer;

#[async_trait]
impl EventHandler<PaymentEvent> for FlagFailedTransfer {
    async fn handle(&self, event: &PaymentEvent) -> Result<(), HandlerError> {
        if let PaymentEvent::TransferFailed(transfer) = event {
            tracing::warn!(
                transfer_id = %transfer.transfer_id,
                reason = ?transfer.reason,
                "Transfer failed"
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let secret = std::env::var("PAYMENTS_WEBHOOK_SECRET")?;

    let dispatcher = WebhookDispatcher::<PaymentEvent>::new()
        .on("payment.success", MarkOrderPaid)
        .on("transfer.failed", FlagFailedTransfer);
    let endpoint = WebhookEndpoint::new(dispatcher, secret);

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(webhook_router("/webhooks/payments", endpoint));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:4021").await?;
    println!("Server running on http://0.0.0.0:4021");
    println!("   POST /webhooks/payments - signed provider webhooks");
    println!("   GET  /health - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": payments_sdk::VERSION
    }))
}
