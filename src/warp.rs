//! Warp integration for provider webhooks
//!
//! This module provides integration with the Warp framework.

use crate::webhook::{webhook_reply, WebhookEndpoint, WebhookEvent};
use warp::{
    http::{HeaderMap, StatusCode},
    reply::{json, with_status, Response},
    Filter, Rejection, Reply,
};

/// Create a Warp filter that receives webhook deliveries
///
/// The filter matches any POST; combine it with a path filter:
///
/// ```rust,ignore
/// let routes = warp::path!("webhooks" / "payments").and(webhook_filter(endpoint));
/// ```
pub fn webhook_filter<E: WebhookEvent>(
    endpoint: WebhookEndpoint<E>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::post()
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and_then(move |headers: HeaderMap, body: bytes::Bytes| {
            let endpoint = endpoint.clone();
            async move {
                let signature = headers
                    .get(endpoint.signature_header())
                    .and_then(|value| value.to_str().ok());
                let result = endpoint.handle(&body, signature).await;
                let (status, reply) = webhook_reply(&result);

                // warp is on a different `http` major version
                let status = StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Ok::<_, Rejection>(with_status(json(&reply), status).into_response())
            }
        })
}
