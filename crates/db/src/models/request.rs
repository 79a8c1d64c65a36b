//! Service request entity, status history entries, and DTOs.

use helphub_core::error::CoreError;
use helphub_core::escrow::EscrowState;
use helphub_core::request_status::RequestStatus;
use helphub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `service_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceRequest {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub volunteer_id: DbId,
    pub message: String,
    pub contact: String,
    pub service_category: Option<String>,
    pub location: Option<String>,
    pub scheduled_for: Option<Timestamp>,
    pub status: String,
    pub payment_status: String,
    pub is_completed_by_helper: bool,
    pub is_confirmed_by_user: bool,
    pub dispute_raised: bool,
    pub admin_override: bool,
    pub viewed_by_helper: bool,
    pub cancel_deadline: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServiceRequest {
    /// Parsed lifecycle status.
    pub fn lifecycle_status(&self) -> Result<RequestStatus, CoreError> {
        self.status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Request {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }

    /// Parsed escrow state.
    pub fn escrow_state(&self) -> Result<EscrowState, CoreError> {
        self.payment_status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Request {} has unknown payment status '{}'",
                self.id, self.payment_status
            ))
        })
    }

    /// Whether `user_id` is the customer or the assigned volunteer.
    pub fn is_party(&self, user_id: DbId) -> bool {
        self.user_id == Some(user_id) || self.volunteer_id == user_id
    }
}

/// A row from the append-only `request_status_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusHistoryEntry {
    pub id: DbId,
    pub request_id: DbId,
    pub status: String,
    pub updated_by: Option<DbId>,
    pub notes: Option<String>,
    pub updated_at: Timestamp,
}

/// Request body for `POST /requests`.
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub volunteer_id: DbId,
    pub message: String,
    pub contact: String,
    pub service_category: Option<String>,
    pub location: Option<String>,
    pub scheduled_for: Option<Timestamp>,
}

/// Insert DTO assembled by the handler (resolves submitter and deadline).
#[derive(Debug)]
pub struct NewServiceRequest<'a> {
    pub user_id: Option<DbId>,
    pub input: &'a CreateServiceRequest,
    pub cancel_deadline: Timestamp,
}

/// Request body for `PUT /requests/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateRequestStatus {
    pub status: String,
    pub notes: Option<String>,
}

/// Optional free-text reason carried by the flag endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ActionNotes {
    pub notes: Option<String>,
}

/// Query parameters for listing requests.
#[derive(Debug, Deserialize)]
pub struct RequestListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for the admin bulk delete.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequests {
    pub ids: Vec<DbId>,
}
