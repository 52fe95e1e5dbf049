//! Actix-web integration for provider webhooks
//!
//! This module provides integration with the Actix-web framework.

use crate::webhook::{webhook_reply, WebhookEndpoint, WebhookEvent};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};

/// Register a POST resource receiving webhook deliveries on `path`
///
/// ```rust,ignore
/// App::new().configure(|cfg| configure_webhook(cfg, "/webhooks/payments", endpoint.clone()))
/// ```
pub fn configure_webhook<E: WebhookEvent>(
    cfg: &mut web::ServiceConfig,
    path: &str,
    endpoint: WebhookEndpoint<E>,
) {
    cfg.app_data(web::Data::new(endpoint))
        .route(path, web::post().to(receive_webhook::<E>));
}

/// Handler behind [`configure_webhook`]
pub async fn receive_webhook<E: WebhookEvent>(
    req: HttpRequest,
    body: web::Bytes,
    endpoint: web::Data<WebhookEndpoint<E>>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(endpoint.signature_header())
        .and_then(|value| value.to_str().ok());
    let result = endpoint.handle(&body, signature).await;
    let (status, reply) = webhook_reply(&result);

    // actix-web is on a different `http` major version
    let status =
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::{sign_payload, PaymentEvent, WebhookDispatcher};
    use actix_web::{test, App};

    const SECRET: &str = "s3cr3t";
    const BODY: &[u8] = br#"{"eventType":"payment.success","transactionId":"T1"}"#;

    fn endpoint() -> WebhookEndpoint<PaymentEvent> {
        WebhookEndpoint::new(WebhookDispatcher::<PaymentEvent>::new(), SECRET)
            .with_signature_header("X-Provider-Signature")
    }

    #[actix_web::test]
    async fn test_signed_delivery_is_acknowledged() {
        let app = test::init_service(
            App::new().configure(|cfg| configure_webhook(cfg, "/webhooks", endpoint())),
        )
        .await;

        let signature = sign_payload(SECRET.as_bytes(), BODY).unwrap();
        let req = test::TestRequest::post()
            .uri("/webhooks")
            .insert_header(("X-Provider-Signature", signature))
            .set_payload(BODY)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_wrong_signature_is_unauthorized() {
        let app = test::init_service(
            App::new().configure(|cfg| configure_webhook(cfg, "/webhooks", endpoint())),
        )
        .await;

        let signature = sign_payload(b"another-secret", BODY).unwrap();
        let req = test::TestRequest::post()
            .uri("/webhooks")
            .insert_header(("X-Provider-Signature", signature))
            .set_payload(BODY)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
