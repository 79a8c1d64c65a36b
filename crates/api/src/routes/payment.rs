//! Route definitions for the `/payments` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST   /                 -> create_payment
/// GET    /                 -> list_payments
/// POST   /escrow           -> create_escrow
/// POST   /release          -> release_payment (admin)
/// POST   /refund           -> refund_payment (admin)
/// GET    /request/{id}     -> list_request_payments
/// GET    /{id}             -> get_payment
/// DELETE /{id}             -> delete_payment (admin)
/// PATCH  /{id}/complete    -> complete_payment (admin)
/// GET    /{id}/timeline    -> get_timeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(payment::create_payment).get(payment::list_payments),
        )
        .route("/escrow", post(payment::create_escrow))
        .route("/release", post(payment::release_payment))
        .route("/refund", post(payment::refund_payment))
        .route("/request/{id}", get(payment::list_request_payments))
        .route(
            "/{id}",
            get(payment::get_payment).delete(payment::delete_payment),
        )
        .route("/{id}/complete", patch(payment::complete_payment))
        .route("/{id}/timeline", get(payment::get_timeline))
}
