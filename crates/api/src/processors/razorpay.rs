//! Razorpay client: orders with deferred capture.
//!
//! A hold is a Razorpay order. The customer's payment against it arrives as
//! a `payment.authorized` webhook carrying the `pay_` id, which then
//! replaces the order id as the stored processor reference.

use async_trait::async_trait;
use helphub_core::escrow::Processor;
use serde::Deserialize;
use serde_json::json;

use super::{check_status, PaymentProcessor, ProcessorError, ProcessorHold};

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
}

/// Talks to the Razorpay REST API with a key id / secret pair.
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, key_id: String, key_secret: String) -> Self {
        Self {
            http,
            key_id,
            key_secret,
            base_url: RAZORPAY_API_BASE.to_string(),
        }
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, ProcessorError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl PaymentProcessor for RazorpayClient {
    fn kind(&self) -> Processor {
        Processor::Razorpay
    }

    async fn create_hold(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> Result<ProcessorHold, ProcessorError> {
        let body = json!({
            "amount": amount,
            "currency": currency.to_uppercase(),
            "receipt": reference,
            "payment_capture": 0,
        });
        let order: Order = self.post_json("/orders", body).await?.json().await?;

        tracing::info!(order_id = %order.id, amount, "Razorpay order created");
        Ok(ProcessorHold {
            processor_payment_id: order.id,
            client_secret: None,
        })
    }

    async fn capture(
        &self,
        processor_payment_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<(), ProcessorError> {
        if !processor_payment_id.starts_with("pay_") {
            return Err(ProcessorError::InvalidResponse(format!(
                "No authorised payment recorded yet for '{processor_payment_id}'"
            )));
        }
        let body = json!({ "amount": amount, "currency": currency.to_uppercase() });
        self.post_json(&format!("/payments/{processor_payment_id}/capture"), body)
            .await?;
        Ok(())
    }

    async fn refund(&self, processor_payment_id: &str) -> Result<(), ProcessorError> {
        if !processor_payment_id.starts_with("pay_") {
            // Nothing was ever paid against the order.
            return Ok(());
        }
        self.post_json(&format!("/payments/{processor_payment_id}/refund"), json!({}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(reqwest::Client::new(), "rzp_test".into(), "secret".into())
    }

    #[tokio::test]
    async fn capture_requires_payment_id() {
        let err = client().capture("order_abc", 100, "inr").await.unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn refund_of_unpaid_order_is_a_no_op() {
        assert!(client().refund("order_abc").await.is_ok());
    }

    #[test]
    fn order_parses() {
        let order: Order =
            serde_json::from_str(r#"{"id":"order_9A33XWu170gUtm","entity":"order"}"#).unwrap();
        assert_eq!(order.id, "order_9A33XWu170gUtm");
    }
}
