//! Example Warp server receiving signed provider webhooks

use async_trait::async_trait;
use payments_sdk::{
    warp::webhook_filter,
    webhook::{EventHandler, HandlerError, WebhookEvent},
    PaymentEvent, WebhookDispatcher, WebhookEndpoint,
};
use warp::Filter;

/// Logs every event it is registered for
struct AuditLog;

#[async_trait]
impl EventHandler<PaymentEvent> for AuditLog {
    async fn handle(&self, event: &PaymentEvent) -> Result<(), HandlerError> {
        tracing::info!(
            event_type = event.event_type(),
            transaction_id = ?event.transaction_id(),
            "Webhook received"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let secret = std::env::var("PAYMENTS_WEBHOOK_SECRET")?;

    let mut dispatcher = WebhookDispatcher::<PaymentEvent>::new();
    for event_type in payments_sdk::webhook::event_types::all() {
        dispatcher.register(event_type, AuditLog);
    }
    let endpoint = WebhookEndpoint::new(dispatcher, secret);

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "healthy" })));
    let webhooks = warp::path!("webhooks" / "payments").and(webhook_filter(endpoint));

    println!("Server running on http://0.0.0.0:4021");
    warp::serve(health.or(webhooks)).run(([0, 0, 0, 0], 4021)).await;

    Ok(())
}
