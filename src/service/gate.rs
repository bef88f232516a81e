use crate::models::VerificationStatus;

/// Why booking controls are disabled for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BlockReason {
    BookingClosed,
    NotAuthenticated,
    VerificationPending,
    VerificationRejected,
    VerificationRequired,
}

impl BlockReason {
    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::BookingClosed => "booking for this event has closed",
            BlockReason::NotAuthenticated => "please log in to book tickets",
            BlockReason::VerificationPending => {
                "your ID verification is pending; you can book once approved"
            }
            BlockReason::VerificationRejected => {
                "your ID verification was rejected; please resubmit your ID"
            }
            BlockReason::VerificationRequired => {
                "please complete your ID verification to book tickets"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Blocked(BlockReason),
}

impl GateDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

/// Pure decision on whether a user may book, first match wins:
/// deadline, then authentication, then verification status.
/// Re-evaluated per request; nothing is cached.
pub fn evaluate(
    authenticated: bool,
    status: Option<VerificationStatus>,
    deadline_passed: bool,
) -> GateDecision {
    if deadline_passed {
        return GateDecision::Blocked(BlockReason::BookingClosed);
    }
    if !authenticated {
        return GateDecision::Blocked(BlockReason::NotAuthenticated);
    }
    match status {
        Some(VerificationStatus::Verified) => GateDecision::Allowed,
        Some(VerificationStatus::Pending) => GateDecision::Blocked(BlockReason::VerificationPending),
        Some(VerificationStatus::Rejected) => {
            GateDecision::Blocked(BlockReason::VerificationRejected)
        }
        _ => GateDecision::Blocked(BlockReason::VerificationRequired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationStatus::*;

    #[test]
    fn verified_user_is_allowed() {
        assert_eq!(evaluate(true, Some(Verified), false), GateDecision::Allowed);
    }

    #[test]
    fn deadline_wins_over_everything() {
        assert_eq!(
            evaluate(true, Some(Verified), true),
            GateDecision::Blocked(BlockReason::BookingClosed)
        );
        assert_eq!(
            evaluate(false, None, true),
            GateDecision::Blocked(BlockReason::BookingClosed)
        );
    }

    #[test]
    fn anonymous_user_must_log_in() {
        assert_eq!(
            evaluate(false, None, false),
            GateDecision::Blocked(BlockReason::NotAuthenticated)
        );
        // status of some other user's snapshot must not matter
        assert_eq!(
            evaluate(false, Some(Verified), false),
            GateDecision::Blocked(BlockReason::NotAuthenticated)
        );
    }

    #[test]
    fn unverified_user_is_blocked_with_status_reason() {
        assert_eq!(
            evaluate(true, Some(Pending), false),
            GateDecision::Blocked(BlockReason::VerificationPending)
        );
        assert_eq!(
            evaluate(true, Some(Rejected), false),
            GateDecision::Blocked(BlockReason::VerificationRejected)
        );
        assert_eq!(
            evaluate(true, Some(NotSubmitted), false),
            GateDecision::Blocked(BlockReason::VerificationRequired)
        );
        assert_eq!(
            evaluate(true, None, false),
            GateDecision::Blocked(BlockReason::VerificationRequired)
        );
    }
}
