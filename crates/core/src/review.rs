//! Review rating rules and the provider rating aggregate.

use crate::error::CoreError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// Maximum length of a review comment (characters).
pub const MAX_COMMENT_LENGTH: usize = 2_000;

/// Validate a star rating.
pub fn validate_rating(rating: i16) -> Result<(), CoreError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING} (got {rating})"
        )));
    }
    Ok(())
}

/// Validate the optional free-text comment.
pub fn validate_comment(comment: &str) -> Result<(), CoreError> {
    let len = comment.chars().count();
    if len > MAX_COMMENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Comment exceeds maximum length of {MAX_COMMENT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Denormalised rating summary stored on the provider's user row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub average_rating: f64,
    pub review_count: i32,
}

/// Reduce every approved rating for a provider into an aggregate.
///
/// The average is rounded to two decimals; no ratings yields `0.0`.
pub fn compute_rating_aggregate(ratings: &[i16]) -> RatingAggregate {
    if ratings.is_empty() {
        return RatingAggregate {
            average_rating: 0.0,
            review_count: 0,
        };
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let average = sum as f64 / ratings.len() as f64;
    RatingAggregate {
        average_rating: (average * 100.0).round() / 100.0,
        review_count: ratings.len() as i32,
    }
}
