//! Review entity model and DTOs.

use helphub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reviews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub provider_id: DbId,
    pub reviewer_id: DbId,
    pub request_id: Option<DbId>,
    pub rating: i16,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a review.
#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub provider_id: DbId,
    pub request_id: Option<DbId>,
    pub rating: i16,
    pub comment: Option<String>,
}

/// DTO for editing a review. All fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// Request body for the admin moderation endpoint.
#[derive(Debug, Deserialize)]
pub struct SetReviewApproval {
    pub is_approved: bool,
}
