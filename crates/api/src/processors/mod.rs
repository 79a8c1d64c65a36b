//! Outbound payment processor clients.
//!
//! Each processor implements [`PaymentProcessor`]. [`Processors`] holds the
//! clients that are configured; handlers look one up by [`Processor`] kind
//! and skip processor calls when it is absent.

pub mod razorpay;
pub mod stripe;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use helphub_core::escrow::Processor;

use crate::config::ProcessorConfig;

/// HTTP request timeout for a single processor call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for processor API calls.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The processor answered with a non-2xx status.
    #[error("Processor returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The processor answered 2xx but the body lacked a required field.
    #[error("Unexpected processor response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Funds authorised but not yet captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorHold {
    /// The processor's id for the hold (Stripe PaymentIntent, Razorpay order).
    pub processor_payment_id: String,
    /// Secret the client needs to complete the authorisation, if any.
    pub client_secret: Option<String>,
}

/// A payment processor capable of escrow-style hold, capture, and refund.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Which processor this client talks to.
    fn kind(&self) -> Processor;

    /// Open an uncaptured hold for `amount` minor units.
    async fn create_hold(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> Result<ProcessorHold, ProcessorError>;

    /// Capture previously held funds.
    async fn capture(
        &self,
        processor_payment_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<(), ProcessorError>;

    /// Refund (or cancel) a hold or capture in full.
    async fn refund(&self, processor_payment_id: &str) -> Result<(), ProcessorError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The processor clients available to handlers.
#[derive(Default, Clone)]
pub struct Processors {
    stripe: Option<Arc<dyn PaymentProcessor>>,
    razorpay: Option<Arc<dyn PaymentProcessor>>,
}

impl Processors {
    /// No processors configured. Escrow still works as bookkeeping only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a client for every processor whose API credentials are set.
    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ProcessorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let mut processors = Self::none();

        if let Some(key) = &config.stripe_secret_key {
            processors = processors.with(Arc::new(stripe::StripeClient::new(
                client.clone(),
                key.clone(),
            )));
        }
        if let (Some(key_id), Some(key_secret)) =
            (&config.razorpay_key_id, &config.razorpay_key_secret)
        {
            processors = processors.with(Arc::new(razorpay::RazorpayClient::new(
                client,
                key_id.clone(),
                key_secret.clone(),
            )));
        }

        Ok(processors)
    }

    /// Register (or replace) a processor client.
    pub fn with(mut self, processor: Arc<dyn PaymentProcessor>) -> Self {
        match processor.kind() {
            Processor::Stripe => self.stripe = Some(processor),
            Processor::Razorpay => self.razorpay = Some(processor),
        }
        self
    }

    /// The client for `kind`, if configured.
    pub fn get(&self, kind: Processor) -> Option<&Arc<dyn PaymentProcessor>> {
        match kind {
            Processor::Stripe => self.stripe.as_ref(),
            Processor::Razorpay => self.razorpay.as_ref(),
        }
    }

    /// Names of the configured processors, for startup logging.
    pub fn configured(&self) -> Vec<&'static str> {
        Processor::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .map(|kind| kind.as_str())
            .collect()
    }
}

/// Turn a non-2xx processor response into [`ProcessorError::Api`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProcessorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProcessorError::Api {
        status: status.as_u16(),
        message,
    })
}
