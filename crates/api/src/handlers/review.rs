//! Handlers for provider reviews.
//!
//! Every write recomputes the provider's rating aggregate from the approved
//! reviews.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helphub_core::error::CoreError;
use helphub_core::review::{compute_rating_aggregate, validate_comment, validate_rating};
use helphub_core::roles::ROLE_VOLUNTEER;
use helphub_core::types::DbId;
use helphub_db::models::review::{CreateReview, Review, UpdateReview};
use helphub_db::repositories::{RequestRepo, ReviewRepo, UserRepo};
use helphub_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

async fn ensure_review_exists(pool: &DbPool, id: DbId) -> AppResult<Review> {
    ReviewRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Review",
            id,
        }))
}

/// Recompute `average_rating` / `review_count` for a provider.
pub(crate) async fn refresh_provider_rating(pool: &DbPool, provider_id: DbId) -> AppResult<()> {
    let ratings = ReviewRepo::approved_ratings_for_provider(pool, provider_id).await?;
    let aggregate = compute_rating_aggregate(&ratings);
    UserRepo::set_rating_aggregate(
        pool,
        provider_id,
        aggregate.average_rating,
        aggregate.review_count,
    )
    .await?;

    tracing::debug!(
        provider_id,
        average_rating = aggregate.average_rating,
        review_count = aggregate.review_count,
        "Provider rating recomputed",
    );
    Ok(())
}

/// POST /reviews
pub async fn create_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateReview>,
) -> AppResult<impl IntoResponse> {
    validate_rating(input.rating)?;
    if let Some(comment) = &input.comment {
        validate_comment(comment)?;
    }
    if input.provider_id == auth.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot review yourself".into(),
        )));
    }

    let provider = UserRepo::find_by_id(&state.pool, input.provider_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.provider_id,
        }))?;
    if provider.role != ROLE_VOLUNTEER {
        return Err(AppError::Core(CoreError::Validation(
            "Only volunteers can be reviewed".into(),
        )));
    }

    if let Some(request_id) = input.request_id {
        let request = RequestRepo::find_by_id(&state.pool, request_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "ServiceRequest",
                id: request_id,
            }))?;
        if request.volunteer_id != provider.id {
            return Err(AppError::Core(CoreError::Validation(
                "The request was not handled by this volunteer".into(),
            )));
        }
        if !auth.is_admin() && request.user_id != Some(auth.user_id) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only the customer who made the request can review it".into(),
            )));
        }
    }

    let review = ReviewRepo::create(&state.pool, auth.user_id, &input).await?;
    refresh_provider_rating(&state.pool, review.provider_id).await?;

    tracing::info!(
        review_id = review.id,
        provider_id = review.provider_id,
        reviewer_id = auth.user_id,
        rating = review.rating,
        "Review created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: review })))
}

/// PUT /reviews/{id}
///
/// Author only. Omitted fields are kept.
pub async fn update_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateReview>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_review_exists(&state.pool, id).await?;
    if existing.reviewer_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author can edit a review".into(),
        )));
    }
    if let Some(rating) = input.rating {
        validate_rating(rating)?;
    }
    if let Some(comment) = &input.comment {
        validate_comment(comment)?;
    }

    let review = ReviewRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Review",
            id,
        }))?;
    refresh_provider_rating(&state.pool, review.provider_id).await?;

    Ok(Json(DataResponse { data: review }))
}

/// DELETE /reviews/{id}
///
/// Author or admin.
pub async fn delete_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let review = ensure_review_exists(&state.pool, id).await?;
    if !auth.is_admin() && review.reviewer_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author or an admin can delete a review".into(),
        )));
    }

    ReviewRepo::delete(&state.pool, id).await?;
    refresh_provider_rating(&state.pool, review.provider_id).await?;

    tracing::info!(review_id = id, actor_id = auth.user_id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /reviews/provider/{id}
///
/// Approved reviews only. Public.
pub async fn list_provider_reviews(
    State(state): State<AppState>,
    Path(provider_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let reviews = ReviewRepo::list_approved_for_provider(&state.pool, provider_id).await?;
    Ok(Json(DataResponse { data: reviews }))
}
