//! Stripe client: manual-capture PaymentIntents.

use async_trait::async_trait;
use helphub_core::escrow::Processor;
use serde::Deserialize;

use super::{check_status, PaymentProcessor, ProcessorError, ProcessorHold};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// The subset of a PaymentIntent we read back.
#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    client_secret: Option<String>,
}

/// Talks to the Stripe REST API with a secret key.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Self {
            http,
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::Response, ProcessorError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    fn kind(&self) -> Processor {
        Processor::Stripe
    }

    async fn create_hold(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> Result<ProcessorHold, ProcessorError> {
        let form = [
            ("amount", amount.to_string()),
            ("currency", currency.to_lowercase()),
            ("capture_method", "manual".to_string()),
            ("metadata[reference]", reference.to_string()),
        ];
        let intent: PaymentIntent = self.post_form("/payment_intents", &form).await?.json().await?;

        tracing::info!(payment_intent = %intent.id, amount, "Stripe PaymentIntent created");
        Ok(ProcessorHold {
            processor_payment_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    async fn capture(
        &self,
        processor_payment_id: &str,
        amount: i64,
        _currency: &str,
    ) -> Result<(), ProcessorError> {
        let form = [("amount_to_capture", amount.to_string())];
        self.post_form(
            &format!("/payment_intents/{processor_payment_id}/capture"),
            &form,
        )
        .await?;
        Ok(())
    }

    async fn refund(&self, processor_payment_id: &str) -> Result<(), ProcessorError> {
        // An uncaptured intent cannot be refunded, only cancelled. Stripe's
        // refund endpoint handles captured intents; fall back to cancel.
        let form = [("payment_intent", processor_payment_id.to_string())];
        match self.post_form("/refunds", &form).await {
            Ok(_) => Ok(()),
            Err(ProcessorError::Api { status: 400, .. }) => {
                self.post_form(
                    &format!("/payment_intents/{processor_payment_id}/cancel"),
                    &[],
                )
                .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
