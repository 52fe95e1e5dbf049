//! Axum integration for provider webhooks

use crate::webhook::{webhook_reply, WebhookEndpoint, WebhookEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create a router that receives webhook deliveries on `path`
///
/// Merge or nest the result into the application router:
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/health", get(health))
///     .merge(webhook_router("/webhooks/payments", endpoint));
/// ```
pub fn webhook_router<E: WebhookEvent>(path: &str, endpoint: WebhookEndpoint<E>) -> Router {
    Router::new()
        .route(path, post(receive_webhook::<E>))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(endpoint)
}

/// Handler behind [`webhook_router`], usable on a custom route
pub async fn receive_webhook<E: WebhookEvent>(
    State(endpoint): State<WebhookEndpoint<E>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(endpoint.signature_header())
        .and_then(|value| value.to_str().ok());
    let result = endpoint.handle(&body, signature).await;
    let (status, reply) = webhook_reply(&result);
    (status, Json(reply)).into_response()
}
