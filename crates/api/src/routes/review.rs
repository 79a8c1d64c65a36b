//! Route definitions for the `/reviews` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::review;
use crate::state::AppState;

/// Routes mounted at `/reviews`.
///
/// ```text
/// POST   /                -> create_review
/// PUT    /{id}            -> update_review (author)
/// DELETE /{id}            -> delete_review (author or admin)
/// GET    /provider/{id}   -> list_provider_reviews (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(review::create_review))
        .route(
            "/{id}",
            put(review::update_review).delete(review::delete_review),
        )
        .route("/provider/{id}", get(review::list_provider_reviews))
}
