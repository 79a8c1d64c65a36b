//! Handlers for service requests: submission, status updates, cancellation
//! and the helper/customer completion handshake.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use helphub_core::error::CoreError;
use helphub_core::escrow::{EscrowState, PaymentStatus};
use helphub_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use helphub_core::request_status::{
    cancel_deadline, validate_cancel, validate_confirm_completion, validate_mark_completed,
    validate_transition, RequestStatus, TransitionKind,
};
use helphub_core::roles::ROLE_VOLUNTEER;
use helphub_core::types::DbId;
use helphub_db::models::request::{
    ActionNotes, CreateServiceRequest, NewServiceRequest, RequestListParams, ServiceRequest,
    UpdateRequestStatus,
};
use helphub_db::repositories::{PaymentRepo, RequestFilter, RequestRepo, UserRepo};
use helphub_db::DbPool;
use helphub_events::bus::{self, DomainEvent};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::payment::release_escrow;
use crate::middleware::auth::{AuthUser, OptionalAuthUser};
use crate::middleware::rbac::RequireVolunteer;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a request or fail with 404.
pub(crate) async fn ensure_request_exists(pool: &DbPool, id: DbId) -> AppResult<ServiceRequest> {
    RequestRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ServiceRequest",
            id,
        }))
}

fn request_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "ServiceRequest",
        id,
    })
}

fn ensure_can_view(auth: &AuthUser, request: &ServiceRequest) -> AppResult<()> {
    if auth.is_admin() || request.is_party(auth.user_id) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "You are not a party to this request".into(),
        )))
    }
}

fn ensure_is_helper(auth: &AuthUser, request: &ServiceRequest) -> AppResult<()> {
    if request.volunteer_id == auth.user_id {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Only the assigned helper can do this".into(),
        )))
    }
}

/// Validate an optional `?status=` filter against the status vocabulary.
pub(crate) fn parse_status_filter(status: Option<&str>) -> AppResult<Option<RequestStatus>> {
    status
        .map(|s| s.parse::<RequestStatus>())
        .transpose()
        .map_err(AppError::Core)
}

async fn list_with_filter(
    state: &AppState,
    user_id: Option<DbId>,
    volunteer_id: Option<DbId>,
    params: &RequestListParams,
) -> AppResult<Vec<ServiceRequest>> {
    let status = parse_status_filter(params.status.as_deref())?;
    let filter = RequestFilter {
        user_id,
        volunteer_id,
        status: status.map(RequestStatus::as_str),
    };
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    Ok(RequestRepo::list_filtered(&state.pool, &filter, limit, offset).await?)
}

/// Release the request's escrow after it was moved to `completed`.
///
/// Failures are logged; the status change stands.
async fn auto_release(state: &AppState, request: &ServiceRequest, actor_id: DbId) {
    let payment =
        match PaymentRepo::find_latest_for_request(&state.pool, request.id, PaymentStatus::Escrow)
            .await
        {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                tracing::warn!(
                    request_id = request.id,
                    "Request marked held but no escrow payment found",
                );
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, request_id = request.id, "Escrow lookup failed");
                return;
            }
        };

    let payment_id = payment.id;
    match release_escrow(state, payment, actor_id, Some("Released on completion")).await {
        Ok(_) => tracing::info!(
            request_id = request.id,
            payment_id,
            "Escrow released automatically on completion",
        ),
        Err(e) => tracing::warn!(
            error = %e,
            request_id = request.id,
            payment_id,
            "Automatic escrow release failed",
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /requests
// ---------------------------------------------------------------------------

/// Submit a help request to a volunteer. Anonymous submissions are allowed.
pub async fn create_request(
    OptionalAuthUser(auth): OptionalAuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateServiceRequest>,
) -> AppResult<impl IntoResponse> {
    if input.message.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Message must not be empty".into(),
        )));
    }
    if input.contact.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Contact details must not be empty".into(),
        )));
    }

    let user_id = auth.as_ref().map(|a| a.user_id);
    if user_id == Some(input.volunteer_id) {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot request help from yourself".into(),
        )));
    }

    let volunteer = UserRepo::find_by_id(&state.pool, input.volunteer_id)
        .await?
        .filter(|u| u.role == ROLE_VOLUNTEER && u.is_active)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Volunteer",
            id: input.volunteer_id,
        }))?;

    let deadline = cancel_deadline(Utc::now(), state.config.cancel_window_mins);
    let request = RequestRepo::create(
        &state.pool,
        &NewServiceRequest {
            user_id,
            input: &input,
            cancel_deadline: deadline,
        },
    )
    .await?;

    tracing::info!(
        request_id = request.id,
        volunteer_id = volunteer.id,
        user_id = ?user_id,
        "Service request submitted",
    );

    let mut event = DomainEvent::new(bus::REQUEST_CREATED)
        .for_request(request.id)
        .notify(Some(volunteer.id))
        .with_payload(json!({ "service_category": request.service_category }));
    if let Some(uid) = user_id {
        event = event.with_actor(uid);
    }
    state.event_bus.publish(event);

    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /requests/mine
pub async fn list_mine(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<impl IntoResponse> {
    let requests = list_with_filter(&state, Some(auth.user_id), None, &params).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /requests/assigned
pub async fn list_assigned(
    RequireVolunteer(auth): RequireVolunteer,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<impl IntoResponse> {
    let requests = list_with_filter(&state, None, Some(auth.user_id), &params).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /requests/{id}
pub async fn get_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_can_view(&auth, &request)?;
    Ok(Json(DataResponse { data: request }))
}

/// GET /requests/{id}/history
pub async fn get_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_can_view(&auth, &request)?;

    let history = RequestRepo::list_history(&state.pool, id).await?;
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// PUT /requests/{id}
// ---------------------------------------------------------------------------

/// Move a request to a new status.
///
/// Parties follow the transition table. Admins may force any status, which
/// sets `admin_override`. Reaching `completed` while funds are held releases
/// the escrow.
pub async fn update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRequestStatus>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_can_view(&auth, &request)?;

    let current = request.lifecycle_status()?;
    let next: RequestStatus = input.status.parse()?;
    let kind = validate_transition(current, next, auth.is_admin())?;
    let forced = kind == TransitionKind::AdminOverride;

    let updated = RequestRepo::update_status(&state.pool, id, next, forced)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    RequestRepo::append_history(
        &state.pool,
        id,
        next.as_str(),
        Some(auth.user_id),
        input.notes.as_deref(),
    )
    .await?;

    tracing::info!(
        request_id = id,
        from = %current,
        to = %next,
        admin_override = forced,
        actor_id = auth.user_id,
        "Request status updated",
    );

    state.event_bus.publish(
        DomainEvent::new(bus::REQUEST_STATUS_CHANGED)
            .for_request(id)
            .with_actor(auth.user_id)
            .notify(updated.user_id)
            .notify(Some(updated.volunteer_id))
            .with_payload(json!({
                "from": current.as_str(),
                "to": next.as_str(),
                "admin_override": forced,
                "notes": input.notes,
            })),
    );

    if next == RequestStatus::Completed && updated.escrow_state()? == EscrowState::Held {
        auto_release(&state, &updated, auth.user_id).await;
        let refreshed = ensure_request_exists(&state.pool, id).await?;
        return Ok(Json(DataResponse { data: refreshed }));
    }

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// PATCH /requests/{id}/cancel
// ---------------------------------------------------------------------------

/// Cancel a request before its deadline. Customer or admin only.
pub async fn cancel_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<ActionNotes>>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    if !auth.is_admin() && request.user_id != Some(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the requesting customer can cancel this request".into(),
        )));
    }

    validate_cancel(
        request.lifecycle_status()?,
        request.cancel_deadline,
        Utc::now(),
    )?;

    let notes = body.map(|Json(b)| b).unwrap_or_default().notes;
    let updated = RequestRepo::update_status(&state.pool, id, RequestStatus::Cancelled, false)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    RequestRepo::append_history(
        &state.pool,
        id,
        RequestStatus::Cancelled.as_str(),
        Some(auth.user_id),
        Some(notes.as_deref().unwrap_or("Cancelled by customer")),
    )
    .await?;

    tracing::info!(request_id = id, actor_id = auth.user_id, "Request cancelled");

    state.event_bus.publish(
        DomainEvent::new(bus::REQUEST_CANCELLED)
            .for_request(id)
            .with_actor(auth.user_id)
            .notify(Some(updated.volunteer_id))
            .notify(updated.user_id)
            .with_payload(json!({ "notes": notes })),
    );

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Workflow flags
// ---------------------------------------------------------------------------

/// PATCH /requests/{id}/viewed
///
/// Idempotent.
pub async fn mark_viewed(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_is_helper(&auth, &request)?;

    if request.viewed_by_helper {
        return Ok(Json(DataResponse { data: request }));
    }

    let updated = RequestRepo::mark_viewed(&state.pool, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;
    Ok(Json(DataResponse { data: updated }))
}

/// PATCH /requests/{id}/mark-completed
///
/// The helper declares the work done. Status and escrow are untouched.
pub async fn mark_completed(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_is_helper(&auth, &request)?;
    validate_mark_completed(request.lifecycle_status()?, request.is_completed_by_helper)?;

    let updated = RequestRepo::mark_completed_by_helper(&state.pool, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;

    tracing::info!(request_id = id, volunteer_id = auth.user_id, "Helper marked completion");

    state.event_bus.publish(
        DomainEvent::new(bus::REQUEST_COMPLETED_BY_HELPER)
            .for_request(id)
            .with_actor(auth.user_id)
            .notify(updated.user_id),
    );

    Ok(Json(DataResponse { data: updated }))
}

/// PATCH /requests/{id}/confirm-completion
///
/// The customer confirms the helper's mark.
pub async fn confirm_completion(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    if request.user_id != Some(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the requesting customer can confirm completion".into(),
        )));
    }
    validate_confirm_completion(request.is_completed_by_helper, request.is_confirmed_by_user)?;

    let updated = RequestRepo::confirm_by_user(&state.pool, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;

    tracing::info!(request_id = id, user_id = auth.user_id, "Customer confirmed completion");

    state.event_bus.publish(
        DomainEvent::new(bus::REQUEST_COMPLETION_CONFIRMED)
            .for_request(id)
            .with_actor(auth.user_id)
            .notify(Some(updated.volunteer_id)),
    );

    Ok(Json(DataResponse { data: updated }))
}

/// PATCH /requests/{id}/raise-dispute
///
/// Raising again is a no-op returning the request unchanged.
pub async fn raise_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<ActionNotes>>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, id).await?;
    ensure_can_view(&auth, &request)?;

    if request.dispute_raised {
        return Ok(Json(DataResponse { data: request }));
    }

    let updated = RequestRepo::raise_dispute(&state.pool, id)
        .await?
        .ok_or_else(|| request_not_found(id))?;

    let notes = body.and_then(|Json(b)| b.notes);
    tracing::warn!(request_id = id, raised_by = auth.user_id, "Dispute raised");

    state.event_bus.publish(
        DomainEvent::new(bus::REQUEST_DISPUTE_RAISED)
            .for_request(id)
            .with_actor(auth.user_id)
            .notify(updated.user_id)
            .notify(Some(updated.volunteer_id))
            .notify_admin()
            .with_payload(json!({ "notes": notes })),
    );

    Ok(Json(DataResponse { data: updated }))
}
