//! Service request lifecycle: status vocabulary, transition table, and the
//! guards for cancellation and the helper/customer completion handshake.
//!
//! The table in [`RequestStatus::allowed_transitions`] is the only place that
//! decides which moves are legal. HTTP handlers and the escrow release path
//! both go through [`validate_transition`].

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default cancellation window after submission, in minutes.
pub const DEFAULT_CANCEL_WINDOW_MINS: i64 = 120;

/// One year. Larger windows are a configuration mistake.
pub const MAX_CANCEL_WINDOW_MINS: i64 = 365 * 24 * 60;

// ---------------------------------------------------------------------------
// Status enum
// ---------------------------------------------------------------------------

/// Primary lifecycle status of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Paid,
    Cancelled,
    Declined,
}

impl RequestStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Requested,
        RequestStatus::Accepted,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Paid,
        RequestStatus::Cancelled,
        RequestStatus::Declined,
    ];

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Accepted => "accepted",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Paid => "paid",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Declined => "declined",
        }
    }

    /// `paid`, `cancelled` and `declined` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Paid | RequestStatus::Cancelled | RequestStatus::Declined
        )
    }

    /// Transition table.
    ///
    /// - `requested`   -> `accepted`, `in_progress`, `completed`, `cancelled`, `declined`
    /// - `accepted`    -> `in_progress`, `completed`, `cancelled`, `declined`
    /// - `in_progress` -> `completed`, `cancelled`, `declined`
    /// - `completed`   -> `paid`
    /// - terminal states -> nothing
    ///
    /// `requested -> completed` is a deliberate fast path for work finished
    /// on first contact.
    pub fn allowed_transitions(self) -> &'static [RequestStatus] {
        use RequestStatus::*;
        match self {
            Requested => &[Accepted, InProgress, Completed, Cancelled, Declined],
            Accepted => &[InProgress, Completed, Cancelled, Declined],
            InProgress => &[Completed, Cancelled, Declined],
            Completed => &[Paid],
            Paid | Cancelled | Declined => &[],
        }
    }

    /// Whether `self -> next` appears in the transition table.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether a customer cancellation is possible from this status
    /// (ignoring the deadline).
    pub fn is_cancellable(self) -> bool {
        !matches!(
            self,
            RequestStatus::Completed
                | RequestStatus::Paid
                | RequestStatus::Cancelled
                | RequestStatus::Declined
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = RequestStatus::ALL.iter().map(|s| s.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid request status '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Transition validation
// ---------------------------------------------------------------------------

/// How a validated status change should be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// The move is listed in the transition table.
    Normal,
    /// An administrator forced a move the table does not list.
    AdminOverride,
}

/// Validate a status change requested by a caller.
///
/// Administrators may force any status from the vocabulary; such moves are
/// reported as [`TransitionKind::AdminOverride`] so the caller can flag the
/// request. Setting the current status again is rejected for everyone.
pub fn validate_transition(
    current: RequestStatus,
    next: RequestStatus,
    is_admin: bool,
) -> Result<TransitionKind, CoreError> {
    if current == next {
        return Err(CoreError::StateConflict(format!(
            "Request is already '{current}'"
        )));
    }
    if current.can_transition_to(next) {
        return Ok(TransitionKind::Normal);
    }
    if is_admin {
        return Ok(TransitionKind::AdminOverride);
    }
    let allowed: Vec<&str> = current
        .allowed_transitions()
        .iter()
        .map(|s| s.as_str())
        .collect();
    Err(CoreError::StateConflict(format!(
        "Cannot move request from '{current}' to '{next}'. Allowed: [{}]",
        allowed.join(", ")
    )))
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Compute the cancellation deadline for a request created at `created_at`.
/// Reject cancellation windows outside `0..=MAX_CANCEL_WINDOW_MINS`.
pub fn validate_cancel_window(window_mins: i64) -> Result<i64, CoreError> {
    if !(0..=MAX_CANCEL_WINDOW_MINS).contains(&window_mins) {
        return Err(CoreError::Validation(format!(
            "Cancel window must be between 0 and {MAX_CANCEL_WINDOW_MINS} minutes (got {window_mins})"
        )));
    }
    Ok(window_mins)
}

pub fn cancel_deadline(created_at: Timestamp, window_mins: i64) -> Timestamp {
    created_at + chrono::Duration::minutes(window_mins)
}

/// Check that a request in `status` may be cancelled at `now`.
pub fn validate_cancel(
    status: RequestStatus,
    deadline: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if !status.is_cancellable() {
        return Err(CoreError::StateConflict(format!(
            "Request cannot be cancelled once it is '{status}'"
        )));
    }
    if now > deadline {
        return Err(CoreError::StateConflict(
            "The cancellation window for this request has passed".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Completion handshake
// ---------------------------------------------------------------------------

/// Guard for the helper marking the work as done. One-way.
pub fn validate_mark_completed(
    status: RequestStatus,
    already_marked: bool,
) -> Result<(), CoreError> {
    if already_marked {
        return Err(CoreError::StateConflict(
            "Request is already marked as completed by the helper".into(),
        ));
    }
    if matches!(status, RequestStatus::Cancelled | RequestStatus::Declined) {
        return Err(CoreError::StateConflict(format!(
            "Cannot mark a '{status}' request as completed"
        )));
    }
    Ok(())
}

/// Guard for the customer confirming completion. Requires the helper mark
/// first and succeeds at most once.
pub fn validate_confirm_completion(
    completed_by_helper: bool,
    already_confirmed: bool,
) -> Result<(), CoreError> {
    if !completed_by_helper {
        return Err(CoreError::StateConflict(
            "The helper has not marked this request as completed yet".into(),
        ));
    }
    if already_confirmed {
        return Err(CoreError::StateConflict(
            "Completion is already confirmed".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn status_strings_round_trip_through_from_str() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert_matches!(
            "finished".parse::<RequestStatus>(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn happy_path_is_allowed() {
        use RequestStatus::*;
        assert!(Requested.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Paid));
    }

    #[test]
    fn requested_can_jump_straight_to_completed() {
        assert_eq!(
            validate_transition(RequestStatus::Requested, RequestStatus::Completed, false).unwrap(),
            TransitionKind::Normal
        );
    }

    #[test]
    fn side_branches_reachable_from_every_non_terminal_state() {
        use RequestStatus::*;
        for from in [Requested, Accepted, InProgress] {
            assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
            assert!(from.can_transition_to(Declined), "{from} -> declined");
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use RequestStatus::*;
        for from in [Paid, Cancelled, Declined] {
            assert!(from.is_terminal());
            assert!(from.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn backwards_move_rejected_for_non_admin() {
        assert_matches!(
            validate_transition(RequestStatus::Completed, RequestStatus::Accepted, false),
            Err(CoreError::StateConflict(_))
        );
    }

    #[test]
    fn admin_can_force_any_move() {
        assert_eq!(
            validate_transition(RequestStatus::Cancelled, RequestStatus::Accepted, true).unwrap(),
            TransitionKind::AdminOverride
        );
    }

    #[test]
    fn same_status_is_rejected_even_for_admin() {
        assert_matches!(
            validate_transition(RequestStatus::Accepted, RequestStatus::Accepted, true),
            Err(CoreError::StateConflict(_))
        );
    }

    #[test]
    fn cancel_deadline_defaults_to_two_hours() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let deadline = cancel_deadline(created, DEFAULT_CANCEL_WINDOW_MINS);
        assert_eq!(deadline, created + Duration::hours(2));
    }

    #[test]
    fn cancel_window_bounds() {
        assert_eq!(validate_cancel_window(0).unwrap(), 0);
        assert_eq!(
            validate_cancel_window(MAX_CANCEL_WINDOW_MINS).unwrap(),
            MAX_CANCEL_WINDOW_MINS
        );
        assert!(validate_cancel_window(-1).is_err());
        assert!(validate_cancel_window(i64::MAX).is_err());

        // The largest accepted window still yields a representable deadline.
        let created = Utc::now();
        assert!(cancel_deadline(created, MAX_CANCEL_WINDOW_MINS) > created);
    }

    #[test]
    fn cancel_allowed_before_deadline_from_open_states() {
        let deadline = Utc::now() + Duration::minutes(30);
        for status in [
            RequestStatus::Requested,
            RequestStatus::Accepted,
            RequestStatus::InProgress,
        ] {
            assert!(validate_cancel(status, deadline, Utc::now()).is_ok());
        }
    }

    #[test]
    fn cancel_rejected_after_deadline() {
        let deadline = Utc::now() - Duration::seconds(1);
        assert_matches!(
            validate_cancel(RequestStatus::Requested, deadline, Utc::now()),
            Err(CoreError::StateConflict(msg)) if msg.contains("window")
        );
    }

    #[test]
    fn cancel_rejected_for_completed_and_cancelled() {
        let deadline = Utc::now() + Duration::hours(1);
        for status in [RequestStatus::Completed, RequestStatus::Cancelled] {
            assert_matches!(
                validate_cancel(status, deadline, Utc::now()),
                Err(CoreError::StateConflict(_))
            );
        }
    }

    #[test]
    fn cancel_exactly_at_deadline_is_allowed() {
        let now = Utc::now();
        assert!(validate_cancel(RequestStatus::Accepted, now, now).is_ok());
    }

    #[test]
    fn confirm_requires_helper_mark() {
        assert_matches!(
            validate_confirm_completion(false, false),
            Err(CoreError::StateConflict(msg)) if msg.contains("not marked")
        );
        assert!(validate_confirm_completion(true, false).is_ok());
    }

    #[test]
    fn confirm_succeeds_at_most_once() {
        assert_matches!(
            validate_confirm_completion(true, true),
            Err(CoreError::StateConflict(msg)) if msg.contains("already confirmed")
        );
    }

    #[test]
    fn mark_completed_is_one_way() {
        assert!(validate_mark_completed(RequestStatus::InProgress, false).is_ok());
        assert_matches!(
            validate_mark_completed(RequestStatus::InProgress, true),
            Err(CoreError::StateConflict(_))
        );
        assert!(validate_mark_completed(RequestStatus::Declined, false).is_err());
    }
}
