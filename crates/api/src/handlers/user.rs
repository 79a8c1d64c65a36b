//! Handlers for user profiles and the volunteer directory.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use helphub_core::error::CoreError;
use helphub_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use helphub_core::types::DbId;
use helphub_db::models::user::{UpdateProfile, UserResponse, VolunteerListParams};
use helphub_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/users/me
///
/// Update the caller's profile and availability. Omitted fields are kept.
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfile>,
) -> AppResult<impl IntoResponse> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "Name must not be empty".into(),
        )));
    }

    let user = UserRepo::update_profile(&state.pool, auth.user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// GET /api/users/volunteers
///
/// Active volunteers, best rated first. `?available_only=true` hides
/// volunteers who switched availability off.
pub async fn list_volunteers(
    State(state): State<AppState>,
    Query(params): Query<VolunteerListParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let volunteers =
        UserRepo::list_volunteers(&state.pool, params.available_only, limit, offset).await?;
    let data: Vec<UserResponse> = volunteers.into_iter().map(UserResponse::from).collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}
