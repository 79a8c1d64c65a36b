//! Repository for the `reviews` table.

use helphub_core::types::DbId;
use sqlx::PgPool;

use crate::models::review::{CreateReview, Review, UpdateReview};

/// Column list for `reviews` queries.
const COLUMNS: &str = "id, provider_id, reviewer_id, request_id, rating, comment, \
                       is_approved, created_at, updated_at";

/// Provides CRUD operations for reviews.
pub struct ReviewRepo;

impl ReviewRepo {
    /// Insert a new review written by `reviewer_id`.
    pub async fn create(
        pool: &PgPool,
        reviewer_id: DbId,
        input: &CreateReview,
    ) -> Result<Review, sqlx::Error> {
        let query = format!(
            "INSERT INTO reviews (provider_id, reviewer_id, request_id, rating, comment) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(input.provider_id)
            .bind(reviewer_id)
            .bind(input.request_id)
            .bind(input.rating)
            .bind(&input.comment)
            .fetch_one(pool)
            .await
    }

    /// Find a review by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update rating and/or comment. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReview,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!(
            "UPDATE reviews SET
                rating = COALESCE($2, rating),
                comment = COALESCE($3, comment)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(input.rating)
            .bind(&input.comment)
            .fetch_optional(pool)
            .await
    }

    /// Approve or hide a review.
    pub async fn set_approval(
        pool: &PgPool,
        id: DbId,
        is_approved: bool,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query =
            format!("UPDATE reviews SET is_approved = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(is_approved)
            .fetch_optional(pool)
            .await
    }

    /// Delete a review. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Approved reviews for a provider, newest first.
    pub async fn list_approved_for_provider(
        pool: &PgPool,
        provider_id: DbId,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reviews WHERE provider_id = $1 AND is_approved = true \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(provider_id)
            .fetch_all(pool)
            .await
    }

    /// Every approved rating for a provider. Feeds the full aggregate recompute.
    pub async fn approved_ratings_for_provider(
        pool: &PgPool,
        provider_id: DbId,
    ) -> Result<Vec<i16>, sqlx::Error> {
        sqlx::query_scalar::<_, i16>(
            "SELECT rating FROM reviews WHERE provider_id = $1 AND is_approved = true",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await
    }
}
