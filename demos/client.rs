//! Example provider client making authenticated calls
//!
//! ```bash
//! PAYMENTS_CLIENT_ID=... PAYMENTS_CLIENT_SECRET=... \
//! PAYMENTS_SANDBOX_URL=https://sandbox.example.com/v1 \
//! PAYMENTS_PRODUCTION_URL=https://api.example.com/v1 \
//! cargo run --example client
//! ```

use payments_sdk::{ClientConfig, Endpoint, ProviderClient, RequestOptions};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePayment {
    amount: Decimal,
    currency: String,
    customer_email: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentInitiated {
    transaction_id: String,
    checkout_url: Option<String>,
}

struct InitiatePaymentEndpoint;

impl Endpoint for InitiatePaymentEndpoint {
    type Request = InitiatePayment;
    type Response = PaymentInitiated;
    const METHOD: Method = Method::POST;

    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/payments")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env("PAYMENTS")?;
    println!("Using {} environment at {}", config.environment.as_str(), config.base_url);

    let client = ProviderClient::new(config)?;

    let request = InitiatePayment {
        amount: Decimal::from_str("2500.00")?,
        currency: "NGN".to_string(),
        customer_email: "customer@example.com".to_string(),
        reference: format!("order-{}", uuid::Uuid::new_v4()),
    };

    // Providers deduplicate requests carrying the same key
    let options = RequestOptions::new().with_generated_idempotency_key();

    match client
        .call_with(&InitiatePaymentEndpoint, &request, &options)
        .await
    {
        Ok(payment) => {
            println!("Payment {} created", payment.transaction_id);
            if let Some(url) = payment.checkout_url {
                println!("Checkout at {url}");
            }
        }
        Err(e) => {
            eprintln!("Payment failed: {e}");
        }
    }

    Ok(())
}
