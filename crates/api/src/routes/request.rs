//! Route definitions for the `/requests` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::request;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// POST  /                          -> create_request (auth optional)
/// GET   /mine                      -> list_mine
/// GET   /assigned                  -> list_assigned (volunteer)
/// GET   /{id}                      -> get_request
/// PUT   /{id}                      -> update_status
/// GET   /{id}/history              -> get_history
/// PATCH /{id}/cancel               -> cancel_request
/// PATCH /{id}/viewed               -> mark_viewed
/// PATCH /{id}/mark-completed       -> mark_completed
/// PATCH /{id}/confirm-completion   -> confirm_completion
/// PATCH /{id}/raise-dispute        -> raise_dispute
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(request::create_request))
        .route("/mine", get(request::list_mine))
        .route("/assigned", get(request::list_assigned))
        .route(
            "/{id}",
            get(request::get_request).put(request::update_status),
        )
        .route("/{id}/history", get(request::get_history))
        .route("/{id}/cancel", patch(request::cancel_request))
        .route("/{id}/viewed", patch(request::mark_viewed))
        .route("/{id}/mark-completed", patch(request::mark_completed))
        .route(
            "/{id}/confirm-completion",
            patch(request::confirm_completion),
        )
        .route("/{id}/raise-dispute", patch(request::raise_dispute))
}
