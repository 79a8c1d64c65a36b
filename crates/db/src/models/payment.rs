//! Payment entity, timeline entries, and escrow DTOs.

use helphub_core::error::CoreError;
use helphub_core::escrow::PaymentStatus;
use helphub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub request_id: DbId,
    pub volunteer_id: DbId,
    pub payer_id: Option<DbId>,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub processor: Option<String>,
    pub processor_payment_id: Option<String>,
    pub client_secret: Option<String>,
    pub platform_fee: Option<i64>,
    pub payout_amount: Option<i64>,
    pub released_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Parsed payment status.
    pub fn payment_status(&self) -> Result<PaymentStatus, CoreError> {
        self.status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Payment {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

/// A row from the append-only `payment_timeline` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimelineEntry {
    pub id: DbId,
    pub payment_id: DbId,
    pub action: String,
    pub status: String,
    pub actor_id: Option<DbId>,
    pub note: Option<String>,
    pub processor_event_id: Option<String>,
    pub created_at: Timestamp,
}

/// Request body for `POST /payments` and `POST /payments/escrow`.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub request_id: DbId,
    pub amount: i64,
    pub currency: Option<String>,
    pub method: String,
}

/// Insert DTO for a payment row.
#[derive(Debug)]
pub struct NewPayment {
    pub request_id: DbId,
    pub volunteer_id: DbId,
    pub payer_id: Option<DbId>,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub processor: Option<String>,
    pub processor_payment_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Request body for `POST /payments/release`.
#[derive(Debug, Deserialize)]
pub struct ReleasePaymentRequest {
    pub payment_id: DbId,
    /// The admin's own password, re-checked on every release.
    pub admin_password: String,
    pub note: Option<String>,
}

/// Request body for `POST /payments/refund`.
#[derive(Debug, Deserialize)]
pub struct RefundPaymentRequest {
    pub payment_id: DbId,
    pub reason: Option<String>,
}

/// Query parameters for listing payments.
#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
