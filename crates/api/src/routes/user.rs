//! Route definitions for the `/users` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// PUT /me          -> update_me (requires auth)
/// GET /volunteers  -> list_volunteers
/// GET /{id}        -> get_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", put(user::update_me))
        .route("/volunteers", get(user::list_volunteers))
        .route("/{id}", get(user::get_user))
}
