//! Repository for the `payments` and `payment_timeline` tables.

use helphub_core::escrow::{PaymentStatus, Settlement};
use helphub_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::{NewPayment, Payment, TimelineEntry};

/// Column list for `payments` queries.
const COLUMNS: &str = "\
    id, request_id, volunteer_id, payer_id, amount, currency, method, status, \
    processor, processor_payment_id, client_secret, platform_fee, payout_amount, \
    released_at, refunded_at, created_at, updated_at";

/// Column list for `payment_timeline` queries.
const TIMELINE_COLUMNS: &str =
    "id, payment_id, action, status, actor_id, note, processor_event_id, created_at";

/// One timeline row to append.
#[derive(Debug)]
pub struct TimelineRecord<'a> {
    pub action: &'a str,
    pub status: PaymentStatus,
    pub actor_id: Option<DbId>,
    pub note: Option<&'a str>,
    pub processor_event_id: Option<&'a str>,
}

/// Provides CRUD operations and status writes for payments.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a new payment row.
    pub async fn create(pool: &PgPool, input: &NewPayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments \
                (request_id, volunteer_id, payer_id, amount, currency, method, status, \
                 processor, processor_payment_id, client_secret) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.request_id)
            .bind(input.volunteer_id)
            .bind(input.payer_id)
            .bind(input.amount)
            .bind(&input.currency)
            .bind(&input.method)
            .bind(&input.status)
            .bind(&input.processor)
            .bind(&input.processor_payment_id)
            .bind(&input.client_secret)
            .fetch_one(pool)
            .await
    }

    /// Find a payment by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a payment by the id the processor assigned to it.
    pub async fn find_by_processor_payment_id(
        pool: &PgPool,
        processor_payment_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE processor_payment_id = $1 \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(processor_payment_id)
            .fetch_optional(pool)
            .await
    }

    /// The most recent payment for a request that is in `status`.
    pub async fn find_latest_for_request(
        pool: &PgPool,
        request_id: DbId,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE request_id = $1 AND status = $2 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(request_id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// All payments for a request, newest first.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE request_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// List payments, optionally restricted to those where `participant_id`
    /// is the payer or the volunteer, and to a status.
    pub async fn list_filtered(
        pool: &PgPool,
        participant_id: Option<DbId>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments \
             WHERE ($1::BIGINT IS NULL OR payer_id = $1 OR volunteer_id = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(participant_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the payment status.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("UPDATE payments SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Replace the stored processor reference (Razorpay order id -> payment id).
    pub async fn set_processor_ref(
        pool: &PgPool,
        id: DbId,
        processor_payment_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET processor_payment_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(processor_payment_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a payment released and record the fee split.
    pub async fn mark_released(
        pool: &PgPool,
        id: DbId,
        settlement: Settlement,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status = $2, platform_fee = $3, payout_amount = $4, \
                released_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(PaymentStatus::Released.as_str())
            .bind(settlement.fee)
            .bind(settlement.payout)
            .fetch_optional(pool)
            .await
    }

    /// Mark a payment refunded.
    pub async fn mark_refunded(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status = $2, refunded_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(PaymentStatus::Refunded.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a payment regardless of status. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- timeline ------------------------------------------------------------

    /// Append an action to the payment timeline.
    pub async fn append_timeline(
        pool: &PgPool,
        payment_id: DbId,
        record: &TimelineRecord<'_>,
    ) -> Result<TimelineEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO payment_timeline \
                (payment_id, action, status, actor_id, note, processor_event_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TIMELINE_COLUMNS}"
        );
        sqlx::query_as::<_, TimelineEntry>(&query)
            .bind(payment_id)
            .bind(record.action)
            .bind(record.status.as_str())
            .bind(record.actor_id)
            .bind(record.note)
            .bind(record.processor_event_id)
            .fetch_one(pool)
            .await
    }

    /// Full timeline for a payment, oldest first.
    pub async fn list_timeline(
        pool: &PgPool,
        payment_id: DbId,
    ) -> Result<Vec<TimelineEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {TIMELINE_COLUMNS} FROM payment_timeline \
             WHERE payment_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, TimelineEntry>(&query)
            .bind(payment_id)
            .fetch_all(pool)
            .await
    }
}
