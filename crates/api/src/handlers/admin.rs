//! Admin-only handlers: user and request oversight, review moderation.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use helphub_core::error::CoreError;
use helphub_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use helphub_core::request_status::RequestStatus;
use helphub_core::types::DbId;
use helphub_db::models::request::{BulkDeleteRequests, RequestListParams};
use helphub_db::models::review::SetReviewApproval;
use helphub_db::models::user::UserResponse;
use helphub_db::repositories::{RequestFilter, RequestRepo, ReviewRepo, UserRepo};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::request::parse_status_filter;
use crate::handlers::review::refresh_provider_rating;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/users
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let users = UserRepo::list(&state.pool, limit, offset).await?;
    let data: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /admin/requests
pub async fn list_requests(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status_filter(params.status.as_deref())?;
    let filter = RequestFilter {
        status: status.map(RequestStatus::as_str),
        ..Default::default()
    };
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let requests = RequestRepo::list_filtered(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// DELETE /admin/requests
///
/// Payments, history and timelines cascade with the request.
pub async fn bulk_delete_requests(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BulkDeleteRequests>,
) -> AppResult<impl IntoResponse> {
    if input.ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one request id is required".into(),
        )));
    }

    let deleted = RequestRepo::delete_many(&state.pool, &input.ids).await?;
    tracing::info!(
        admin_id = admin.user_id,
        requested = input.ids.len(),
        deleted,
        "Requests bulk deleted",
    );

    Ok(Json(DataResponse {
        data: json!({ "deleted": deleted }),
    }))
}

/// PATCH /admin/reviews/{id}/approval
pub async fn set_review_approval(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetReviewApproval>,
) -> AppResult<impl IntoResponse> {
    let review = ReviewRepo::set_approval(&state.pool, id, input.is_approved)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Review",
            id,
        }))?;
    refresh_provider_rating(&state.pool, review.provider_id).await?;

    tracing::info!(
        review_id = id,
        admin_id = admin.user_id,
        is_approved = input.is_approved,
        "Review moderation updated",
    );

    Ok(Json(DataResponse { data: review }))
}
