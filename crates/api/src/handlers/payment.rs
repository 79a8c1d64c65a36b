//! Handlers for payments and the escrow workflow.
//!
//! Payment writes and the request-side `payment_status` mirror are separate
//! statements. The mirror is always computed with
//! [`PaymentStatus::escrow_state`] right after the payment write.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helphub_core::error::CoreError;
use helphub_core::escrow::{
    compute_settlement, validate_amount, validate_complete, validate_hold, validate_refund,
    validate_release, validate_release_for_request, PaymentMethod, PaymentStatus, Processor,
    DEFAULT_CURRENCY,
};
use helphub_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use helphub_core::request_status::RequestStatus;
use helphub_core::types::DbId;
use helphub_db::models::payment::{
    CreatePaymentRequest, NewPayment, Payment, PaymentListParams, RefundPaymentRequest,
    ReleasePaymentRequest,
};
use helphub_db::models::request::ServiceRequest;
use helphub_db::repositories::{PaymentRepo, RequestRepo, TimelineRecord, UserRepo};
use helphub_db::DbPool;
use helphub_events::bus::{self, DomainEvent};
use serde_json::json;

use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::handlers::request::ensure_request_exists;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::processors::PaymentProcessor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_payment_exists(pool: &DbPool, id: DbId) -> AppResult<Payment> {
    PaymentRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Payment",
            id,
        }))
}

fn payment_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Payment",
        id,
    })
}

/// Admins see every payment; otherwise only the payer and the volunteer.
fn ensure_can_view_payment(auth: &AuthUser, payment: &Payment) -> AppResult<()> {
    if auth.is_admin()
        || payment.payer_id == Some(auth.user_id)
        || payment.volunteer_id == auth.user_id
    {
        return Ok(());
    }
    Err(AppError::Core(CoreError::Forbidden(
        "You are not a party to this payment".into(),
    )))
}

/// Write the request-side view of `status`.
pub(crate) async fn sync_request_escrow(
    pool: &DbPool,
    request_id: DbId,
    status: PaymentStatus,
) -> AppResult<()> {
    RequestRepo::set_payment_status(pool, request_id, status.escrow_state().as_str()).await?;
    Ok(())
}

/// Move a request's lifecycle status as a consequence of a payment action.
///
/// Moves the transition table does not list are stored with the override
/// flag so they stand out in audits.
async fn settle_request_status(
    pool: &DbPool,
    request: &ServiceRequest,
    target: RequestStatus,
    actor_id: DbId,
    note: &str,
) -> AppResult<()> {
    let current = request.lifecycle_status()?;
    if current == target {
        return Ok(());
    }
    let forced = !current.can_transition_to(target);
    RequestRepo::update_status(pool, request.id, target, forced).await?;
    RequestRepo::append_history(pool, request.id, target.as_str(), Some(actor_id), Some(note))
        .await?;
    Ok(())
}

/// The configured processor client and reference for a payment, if both exist.
fn processor_for<'a>(
    state: &AppState,
    payment: &'a Payment,
) -> Option<(Arc<dyn PaymentProcessor>, &'a str)> {
    let kind: Processor = payment.processor.as_deref()?.parse().ok()?;
    let reference = payment.processor_payment_id.as_deref()?;
    let client = state.processors.get(kind)?.clone();
    Some((client, reference))
}

/// Processor that backs escrow holds for a payment method.
fn hold_processor(method: PaymentMethod) -> Option<Processor> {
    match method {
        PaymentMethod::CreditCard => Some(Processor::Stripe),
        PaymentMethod::Upi => Some(Processor::Razorpay),
        PaymentMethod::BankTransfer | PaymentMethod::Paypal | PaymentMethod::Cash => None,
    }
}

/// Shared validation for both payment creation routes.
///
/// Returns the request, the parsed method, and the normalised currency.
async fn prepare_payment(
    state: &AppState,
    auth: &AuthUser,
    input: &CreatePaymentRequest,
) -> AppResult<(ServiceRequest, PaymentMethod, String)> {
    validate_amount(input.amount)?;
    let method: PaymentMethod = input.method.parse()?;

    let currency = input
        .currency
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Currency must be a three-letter ISO code (got '{currency}')"
        ))));
    }

    let request = ensure_request_exists(&state.pool, input.request_id).await?;
    if !auth.is_admin() && request.user_id != Some(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the requesting customer can pay for this request".into(),
        )));
    }
    validate_hold(request.lifecycle_status()?)?;

    Ok((request, method, currency))
}

/// Release an escrowed payment: fee split, request marked paid, processor
/// capture attempted.
///
/// Used by the admin release route and by the automatic release when a
/// held request is completed.
pub(crate) async fn release_escrow(
    state: &AppState,
    payment: Payment,
    actor_id: DbId,
    note: Option<&str>,
) -> AppResult<Payment> {
    validate_release(payment.payment_status()?)?;

    let request = ensure_request_exists(&state.pool, payment.request_id).await?;
    validate_release_for_request(request.lifecycle_status()?)?;

    let settlement = compute_settlement(payment.amount);
    let released = PaymentRepo::mark_released(&state.pool, payment.id, settlement)
        .await?
        .ok_or_else(|| payment_not_found(payment.id))?;

    sync_request_escrow(&state.pool, request.id, PaymentStatus::Released).await?;
    settle_request_status(
        &state.pool,
        &request,
        RequestStatus::Paid,
        actor_id,
        "Escrow released to volunteer",
    )
    .await?;

    PaymentRepo::append_timeline(
        &state.pool,
        released.id,
        &TimelineRecord {
            action: "release",
            status: PaymentStatus::Released,
            actor_id: Some(actor_id),
            note,
            processor_event_id: None,
        },
    )
    .await?;

    if let Some((client, reference)) = processor_for(state, &released) {
        if let Err(e) = client
            .capture(reference, released.amount, &released.currency)
            .await
        {
            tracing::warn!(
                error = %e,
                payment_id = released.id,
                processor = %client.kind(),
                "Processor capture failed; escrow released locally",
            );
        }
    }

    tracing::info!(
        payment_id = released.id,
        request_id = request.id,
        fee = settlement.fee,
        payout = settlement.payout,
        actor_id,
        "Escrow released",
    );

    state.event_bus.publish(
        DomainEvent::new(bus::PAYMENT_RELEASED)
            .for_request(request.id)
            .with_actor(actor_id)
            .notify(Some(request.volunteer_id))
            .notify(request.user_id)
            .with_payload(json!({
                "payment_id": released.id,
                "amount": released.amount,
                "platform_fee": settlement.fee,
                "payout_amount": settlement.payout,
            })),
    );

    Ok(released)
}

// ---------------------------------------------------------------------------
// POST /payments
// ---------------------------------------------------------------------------

/// Record a pending payment (cash, bank transfer, ...) for a request.
pub async fn create_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let (request, method, currency) = prepare_payment(&state, &auth, &input).await?;

    let payment = PaymentRepo::create(
        &state.pool,
        &NewPayment {
            request_id: request.id,
            volunteer_id: request.volunteer_id,
            payer_id: Some(auth.user_id),
            amount: input.amount,
            currency,
            method: method.as_str().to_string(),
            status: PaymentStatus::Pending.as_str().to_string(),
            processor: None,
            processor_payment_id: None,
            client_secret: None,
        },
    )
    .await?;

    PaymentRepo::append_timeline(
        &state.pool,
        payment.id,
        &TimelineRecord {
            action: "created",
            status: PaymentStatus::Pending,
            actor_id: Some(auth.user_id),
            note: None,
            processor_event_id: None,
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        request_id = request.id,
        amount = payment.amount,
        method = %method,
        "Payment recorded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: payment })))
}

// ---------------------------------------------------------------------------
// POST /payments/escrow
// ---------------------------------------------------------------------------

/// Hold funds in escrow for a request.
///
/// Card payments open a manual-capture Stripe PaymentIntent and UPI
/// payments a Razorpay order, when those processors are configured.
pub async fn create_escrow(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let (request, method, currency) = prepare_payment(&state, &auth, &input).await?;

    let client = hold_processor(method).and_then(|kind| state.processors.get(kind).cloned());
    let (processor, hold) = match client {
        Some(client) => {
            let hold = client
                .create_hold(input.amount, &currency, &format!("request-{}", request.id))
                .await?;
            (Some(client.kind().as_str().to_string()), Some(hold))
        }
        None => (None, None),
    };

    let payment = PaymentRepo::create(
        &state.pool,
        &NewPayment {
            request_id: request.id,
            volunteer_id: request.volunteer_id,
            payer_id: Some(auth.user_id),
            amount: input.amount,
            currency,
            method: method.as_str().to_string(),
            status: PaymentStatus::Escrow.as_str().to_string(),
            processor,
            processor_payment_id: hold.as_ref().map(|h| h.processor_payment_id.clone()),
            client_secret: hold.and_then(|h| h.client_secret),
        },
    )
    .await?;

    sync_request_escrow(&state.pool, request.id, PaymentStatus::Escrow).await?;

    PaymentRepo::append_timeline(
        &state.pool,
        payment.id,
        &TimelineRecord {
            action: "hold",
            status: PaymentStatus::Escrow,
            actor_id: Some(auth.user_id),
            note: None,
            processor_event_id: None,
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        request_id = request.id,
        amount = payment.amount,
        processor = ?payment.processor,
        "Funds held in escrow",
    );

    state.event_bus.publish(
        DomainEvent::new(bus::PAYMENT_HELD)
            .for_request(request.id)
            .with_actor(auth.user_id)
            .notify(Some(request.volunteer_id))
            .with_payload(json!({ "payment_id": payment.id, "amount": payment.amount })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: payment })))
}

// ---------------------------------------------------------------------------
// POST /payments/release
// ---------------------------------------------------------------------------

/// Release an escrowed payment to the volunteer.
///
/// The admin must re-enter their own password.
pub async fn release_payment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<ReleasePaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let admin_user = UserRepo::find_by_id(&state.pool, admin.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unknown admin account".into())))?;

    let password_ok = verify_password(&input.admin_password, &admin_user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_ok {
        tracing::warn!(admin_id = admin.user_id, "Release rejected: wrong admin password");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Admin password is incorrect".into(),
        )));
    }

    let payment = ensure_payment_exists(&state.pool, input.payment_id).await?;
    let released = release_escrow(&state, payment, admin.user_id, input.note.as_deref()).await?;

    Ok(Json(DataResponse { data: released }))
}

// ---------------------------------------------------------------------------
// POST /payments/refund
// ---------------------------------------------------------------------------

/// Refund a payment that has not been released. The request is cancelled.
pub async fn refund_payment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<RefundPaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let payment = ensure_payment_exists(&state.pool, input.payment_id).await?;
    validate_refund(payment.payment_status()?)?;

    let request = ensure_request_exists(&state.pool, payment.request_id).await?;

    let refunded = PaymentRepo::mark_refunded(&state.pool, payment.id)
        .await?
        .ok_or_else(|| payment_not_found(payment.id))?;

    sync_request_escrow(&state.pool, request.id, PaymentStatus::Refunded).await?;
    settle_request_status(
        &state.pool,
        &request,
        RequestStatus::Cancelled,
        admin.user_id,
        "Payment refunded",
    )
    .await?;

    PaymentRepo::append_timeline(
        &state.pool,
        refunded.id,
        &TimelineRecord {
            action: "refund",
            status: PaymentStatus::Refunded,
            actor_id: Some(admin.user_id),
            note: input.reason.as_deref(),
            processor_event_id: None,
        },
    )
    .await?;

    if let Some((client, reference)) = processor_for(&state, &refunded) {
        if let Err(e) = client.refund(reference).await {
            tracing::warn!(
                error = %e,
                payment_id = refunded.id,
                processor = %client.kind(),
                "Processor refund failed; payment refunded locally",
            );
        }
    }

    tracing::info!(
        payment_id = refunded.id,
        request_id = request.id,
        admin_id = admin.user_id,
        "Payment refunded",
    );

    state.event_bus.publish(
        DomainEvent::new(bus::PAYMENT_REFUNDED)
            .for_request(request.id)
            .with_actor(admin.user_id)
            .notify(request.user_id)
            .notify(Some(request.volunteer_id))
            .with_payload(json!({
                "payment_id": refunded.id,
                "amount": refunded.amount,
                "reason": input.reason,
            })),
    );

    Ok(Json(DataResponse { data: refunded }))
}

// ---------------------------------------------------------------------------
// PATCH /payments/{id}/complete
// ---------------------------------------------------------------------------

/// Mark a pending offline payment as received.
pub async fn complete_payment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = ensure_payment_exists(&state.pool, id).await?;
    validate_complete(payment.payment_status()?)?;

    let completed = PaymentRepo::update_status(&state.pool, id, PaymentStatus::Completed)
        .await?
        .ok_or_else(|| payment_not_found(id))?;

    sync_request_escrow(&state.pool, completed.request_id, PaymentStatus::Completed).await?;

    PaymentRepo::append_timeline(
        &state.pool,
        id,
        &TimelineRecord {
            action: "complete",
            status: PaymentStatus::Completed,
            actor_id: Some(admin.user_id),
            note: None,
            processor_event_id: None,
        },
    )
    .await?;

    tracing::info!(payment_id = id, admin_id = admin.user_id, "Payment completed");

    Ok(Json(DataResponse { data: completed }))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /payments
///
/// Admins see all payments. Everyone else sees payments where they are the
/// payer or the volunteer.
pub async fn list_payments(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref s) = params.status {
        s.parse::<PaymentStatus>()?;
    }

    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let participant = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };

    let payments = PaymentRepo::list_filtered(
        &state.pool,
        participant,
        params.status.as_deref(),
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse { data: payments }))
}

/// GET /payments/{id}
pub async fn get_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = ensure_payment_exists(&state.pool, id).await?;
    ensure_can_view_payment(&auth, &payment)?;
    Ok(Json(DataResponse { data: payment }))
}

/// GET /payments/request/{request_id}
pub async fn list_request_payments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = ensure_request_exists(&state.pool, request_id).await?;
    if !auth.is_admin() && !request.is_party(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You are not a party to this request".into(),
        )));
    }

    let payments = PaymentRepo::list_for_request(&state.pool, request_id).await?;
    Ok(Json(DataResponse { data: payments }))
}

/// GET /payments/{id}/timeline
pub async fn get_timeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = ensure_payment_exists(&state.pool, id).await?;
    ensure_can_view_payment(&auth, &payment)?;

    let timeline = PaymentRepo::list_timeline(&state.pool, id).await?;
    Ok(Json(DataResponse { data: timeline }))
}

// ---------------------------------------------------------------------------
// DELETE /payments/{id}
// ---------------------------------------------------------------------------

/// Hard-delete a payment regardless of status. The request view is left as is.
pub async fn delete_payment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = PaymentRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(payment_not_found(id));
    }

    tracing::info!(payment_id = id, admin_id = admin.user_id, "Payment deleted");
    Ok(StatusCode::NO_CONTENT)
}
