pub mod admin;
pub mod auth;
pub mod health;
pub mod payment;
pub mod request;
pub mod review;
pub mod user;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                         register (public)
/// /auth/login                            login (public)
/// /auth/me                               current user
///
/// /users/me                              update own profile
/// /users/volunteers                      volunteer directory (public)
/// /users/{id}                            public profile
///
/// /requests                              submit (auth optional)
/// /requests/mine                         customer's requests
/// /requests/assigned                     helper's requests
/// /requests/{id}                         get, update status
/// /requests/{id}/history                 status history
/// /requests/{id}/cancel                  cancel before deadline
/// /requests/{id}/viewed                  helper opened it
/// /requests/{id}/mark-completed          helper done
/// /requests/{id}/confirm-completion      customer confirms
/// /requests/{id}/raise-dispute           dispute
///
/// /payments                              record, list
/// /payments/escrow                       hold funds
/// /payments/release                      release escrow (admin)
/// /payments/refund                       refund (admin)
/// /payments/request/{id}                 payments for a request
/// /payments/{id}                         get, delete (admin)
/// /payments/{id}/complete                mark offline payment received
/// /payments/{id}/timeline                payment timeline
///
/// /stripe/webhook                        Stripe events
/// /razorpay/webhook                      Razorpay events
///
/// /reviews                               create
/// /reviews/{id}                          update, delete
/// /reviews/provider/{id}                 approved reviews (public)
///
/// /admin/users                           list users
/// /admin/requests                        list, bulk delete
/// /admin/reviews/{id}/approval           moderate
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", user::router())
        .nest("/requests", request::router())
        .nest("/payments", payment::router())
        // Processor callbacks sit at the API root.
        .merge(webhook::router())
        .nest("/reviews", review::router())
        .nest("/admin", admin::router())
}
