//! Repository for the `service_requests` and `request_status_history` tables.

use helphub_core::request_status::RequestStatus;
use helphub_core::types::DbId;
use sqlx::PgPool;

use crate::models::request::{NewServiceRequest, ServiceRequest, StatusHistoryEntry};

/// Column list for `service_requests` queries.
const COLUMNS: &str = "\
    id, user_id, volunteer_id, message, contact, service_category, location, \
    scheduled_for, status, payment_status, is_completed_by_helper, \
    is_confirmed_by_user, dispute_raised, admin_override, viewed_by_helper, \
    cancel_deadline, created_at, updated_at";

/// Column list for `request_status_history` queries.
const HISTORY_COLUMNS: &str = "id, request_id, status, updated_by, notes, updated_at";

/// Filters for [`RequestRepo::list_filtered`]. `None` means "any".
#[derive(Debug, Default)]
pub struct RequestFilter<'a> {
    pub user_id: Option<DbId>,
    pub volunteer_id: Option<DbId>,
    pub status: Option<&'a str>,
}

/// Provides CRUD operations and status writes for service requests.
pub struct RequestRepo;

impl RequestRepo {
    /// Insert a new request together with its initial history entry.
    pub async fn create(
        pool: &PgPool,
        new: &NewServiceRequest<'_>,
    ) -> Result<ServiceRequest, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO service_requests \
                (user_id, volunteer_id, message, contact, service_category, \
                 location, scheduled_for, cancel_deadline) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(new.user_id)
            .bind(new.input.volunteer_id)
            .bind(&new.input.message)
            .bind(&new.input.contact)
            .bind(&new.input.service_category)
            .bind(&new.input.location)
            .bind(new.input.scheduled_for)
            .bind(new.cancel_deadline)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO request_status_history (request_id, status, updated_by, notes) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(request.id)
        .bind(RequestStatus::Requested.as_str())
        .bind(new.user_id)
        .bind("Request submitted")
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Find a request by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_requests WHERE id = $1");
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests matching `filter`, newest first.
    pub async fn list_filtered(
        pool: &PgPool,
        filter: &RequestFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.volunteer_id.is_some() {
            conditions.push(format!("volunteer_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM service_requests {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, ServiceRequest>(&query);
        if let Some(uid) = filter.user_id {
            q = q.bind(uid);
        }
        if let Some(vid) = filter.volunteer_id {
            q = q.bind(vid);
        }
        if let Some(s) = filter.status {
            q = q.bind(s);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    /// Set the lifecycle status. `admin_override` is sticky: once a request
    /// has been forced by an administrator the flag stays set.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: RequestStatus,
        admin_override: bool,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests \
             SET status = $2, admin_override = admin_override OR $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(admin_override)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the request-side escrow view.
    pub async fn set_payment_status(
        pool: &PgPool,
        id: DbId,
        payment_status: &str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests SET payment_status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(payment_status)
            .fetch_optional(pool)
            .await
    }

    /// Helper marks the work as done.
    pub async fn mark_completed_by_helper(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        Self::set_flag(pool, id, "is_completed_by_helper").await
    }

    /// Customer confirms the helper's completion.
    pub async fn confirm_by_user(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        Self::set_flag(pool, id, "is_confirmed_by_user").await
    }

    /// Either party raises a dispute.
    pub async fn raise_dispute(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        Self::set_flag(pool, id, "dispute_raised").await
    }

    /// The helper has opened the request.
    pub async fn mark_viewed(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        Self::set_flag(pool, id, "viewed_by_helper").await
    }

    /// Set one of the one-way boolean workflow flags. `column` is always a
    /// compile-time constant from the wrappers above.
    async fn set_flag(
        pool: &PgPool,
        id: DbId,
        column: &'static str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests SET {column} = true WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a batch of requests. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM service_requests WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    // -- status history ------------------------------------------------------

    /// Append an entry to the request's status history.
    pub async fn append_history(
        pool: &PgPool,
        request_id: DbId,
        status: &str,
        updated_by: Option<DbId>,
        notes: Option<&str>,
    ) -> Result<StatusHistoryEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO request_status_history (request_id, status, updated_by, notes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {HISTORY_COLUMNS}"
        );
        sqlx::query_as::<_, StatusHistoryEntry>(&query)
            .bind(request_id)
            .bind(status)
            .bind(updated_by)
            .bind(notes)
            .fetch_one(pool)
            .await
    }

    /// Full history for a request, oldest first.
    pub async fn list_history(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM request_status_history \
             WHERE request_id = $1 ORDER BY updated_at ASC, id ASC"
        );
        sqlx::query_as::<_, StatusHistoryEntry>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }
}
