//! Route definitions for processor webhooks.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes merged at the `/api` root.
///
/// Authenticated by signature, not by bearer token.
///
/// ```text
/// POST /stripe/webhook    -> stripe_webhook
/// POST /razorpay/webhook  -> razorpay_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stripe/webhook", post(webhook::stripe_webhook))
        .route("/razorpay/webhook", post(webhook::razorpay_webhook))
}
