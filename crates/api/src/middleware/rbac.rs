//! Role-gated extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use helphub_core::error::CoreError;
use helphub_core::roles::{ROLE_ADMIN, ROLE_VOLUNTEER};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticate, then require one of `allowed`. Admins always pass.
async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[&str],
    denial: &'static str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if user.is_admin() || allowed.contains(&user.role.as_str()) {
        return Ok(user);
    }
    tracing::debug!(user_id = user.user_id, role = %user.role, denial, "Role check failed");
    Err(AppError::Core(CoreError::Forbidden(denial.into())))
}

/// Admin-only routes: payouts, refunds, moderation.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[ROLE_ADMIN], "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// Helper-side routes. Admins are let through.
pub struct RequireVolunteer(pub AuthUser);

impl FromRequestParts<AppState> for RequireVolunteer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[ROLE_VOLUNTEER], "Volunteer role required")
            .await
            .map(RequireVolunteer)
    }
}
