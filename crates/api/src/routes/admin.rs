//! Route definitions for the `/admin` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /users                  -> list_users
/// GET    /requests               -> list_requests
/// DELETE /requests               -> bulk_delete_requests
/// PATCH  /reviews/{id}/approval  -> set_review_approval
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/requests",
            get(admin::list_requests).delete(admin::bulk_delete_requests),
        )
        .route("/reviews/{id}/approval", patch(admin::set_review_approval))
}
