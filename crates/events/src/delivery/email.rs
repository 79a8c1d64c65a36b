//! SMTP notices for request and payment events.
//!
//! Email is optional: without `SMTP_HOST`, [`EmailConfig::from_env`] yields
//! `None` and the dispatcher only logs.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::bus::{self, DomainEvent};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(#[from] lettre::error::Error),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@helphub.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// `SMTP_HOST` enables email. `SMTP_PORT` (587), `SMTP_FROM`,
    /// `SMTP_USER` and `SMTP_PASSWORD` are optional.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        let smtp_port = match std::env::var("SMTP_PORT").map(|p| p.parse::<u16>()) {
            Ok(Ok(port)) => port,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Invalid SMTP_PORT, using {DEFAULT_SMTP_PORT}");
                DEFAULT_SMTP_PORT
            }
            Err(_) => DEFAULT_SMTP_PORT,
        };
        Some(Self {
            smtp_host,
            smtp_port,
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// `1050` -> `"10.50"`. Amounts are stored in minor units.
fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn headline(event_type: &str) -> &'static str {
    match event_type {
        bus::REQUEST_CREATED => "You have a new service request",
        bus::REQUEST_STATUS_CHANGED => "A service request changed status",
        bus::REQUEST_CANCELLED => "A service request was cancelled",
        bus::REQUEST_COMPLETED_BY_HELPER => "Your helper marked the request as completed",
        bus::REQUEST_COMPLETION_CONFIRMED => "The customer confirmed completion",
        bus::REQUEST_DISPUTE_RAISED => "A dispute was raised on a service request",
        bus::PAYMENT_HELD => "Payment is being held in escrow",
        bus::PAYMENT_RELEASED => "Escrowed payment was released",
        bus::PAYMENT_REFUNDED => "Payment was refunded",
        _ => "Service request update",
    }
}

/// Subject and plain-text body for `event`.
pub fn render(event: &DomainEvent) -> (String, String) {
    let what = headline(&event.event_type);
    let subject = match event.request_id {
        Some(id) => format!("[HelpHub] {what} (request #{id})"),
        None => format!("[HelpHub] {what}"),
    };

    let mut lines = vec![format!("{what}."), String::new()];
    let payload = &event.payload;
    if let Some(status) = payload["status"].as_str() {
        lines.push(format!("New status: {status}"));
    }
    for (key, label) in [
        ("amount", "Amount"),
        ("platform_fee", "Platform fee"),
        ("payout_amount", "Paid to helper"),
    ] {
        if let Some(value) = payload[key].as_i64() {
            lines.push(format!("{label}: {}", format_minor_units(value)));
        }
    }
    for (key, label) in [("reason", "Reason"), ("notes", "Notes")] {
        if let Some(text) = payload[key].as_str() {
            lines.push(format!("{label}: {text}"));
        }
    }
    lines.push(format!(
        "Time: {}",
        event.timestamp.format("%Y-%m-%d %H:%M UTC")
    ));

    (subject, lines.join("\n"))
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Reusable SMTP sender. `lettre` pools the connections.
#[derive(Clone)]
pub struct EmailDelivery {
    from_address: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

fn build_message(from: &str, to: &str, subject: &str, body: String) -> Result<Message, EmailError> {
    Ok(Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)?)
}

impl EmailDelivery {
    /// STARTTLS relay to `config.smtp_host`, authenticated when both
    /// credentials are set.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            from_address: config.from_address,
            mailer: builder.build(),
        })
    }

    /// Send the notice for `event` to one address.
    pub async fn deliver(&self, to_email: &str, event: &DomainEvent) -> Result<(), EmailError> {
        let (subject, body) = render(event);
        let message = build_message(&self.from_address, to_email, &subject, body)?;
        self.mailer.send(message).await?;
        tracing::info!(to = to_email, event_type = %event.event_type, "Notification email sent");
        Ok(())
    }
}
