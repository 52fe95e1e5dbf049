//! Example Actix-web server receiving signed provider webhooks
//!
//! Reads the client configuration (including the webhook secret) from
//! `PAYMENTS_*` environment variables.

use actix_web::{web, App, HttpResponse, HttpServer};
use async_trait::async_trait;
use payments_sdk::{
    actix_web::configure_webhook,
    webhook::{EventHandler, HandlerError},
    ClientConfig, PaymentEvent, WebhookDispatcher, WebhookEndpoint,
};

struct LogRefund;

#[async_trait]
impl EventHandler<PaymentEvent> for LogRefund {
    async fn handle(&self, event: &PaymentEvent) -> Result<(), HandlerError> {
        if let PaymentEvent::RefundProcessed(refund) = event {
            tracing::info!(refund_id = %refund.refund_id, "Refund processed");
        }
        Ok(())
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env("PAYMENTS")
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let dispatcher = WebhookDispatcher::<PaymentEvent>::new().on("refund.processed", LogRefund);
    let endpoint = WebhookEndpoint::from_config(&config, dispatcher)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?
        .with_signature_header("X-Provider-Signature");

    println!("Server running on http://0.0.0.0:4021");

    HttpServer::new(move || {
        let endpoint = endpoint.clone();
        App::new()
            .route("/health", web::get().to(health))
            .configure(|cfg| configure_webhook(cfg, "/webhooks/payments", endpoint))
    })
    .bind("0.0.0.0:4021")?
    .run()
    .await
}
