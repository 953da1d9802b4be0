//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{normalize_code, AccessGrant};
use crate::reveal::{RevealState, RevealWindow};

/// Validate that a derived reveal window is internally consistent
pub fn assert_window_invariants(window: &RevealWindow) {
    debug_assert!(
        window.remaining_secs <= window.duration_secs,
        "Remaining {}s exceeds window duration {}s",
        window.remaining_secs,
        window.duration_secs
    );

    debug_assert!(
        window.expired == (window.state == RevealState::Expired),
        "Expired flag {} disagrees with state {:?}",
        window.expired,
        window.state
    );

    if window.expired {
        debug_assert!(
            window.remaining_secs == 0,
            "Expired window still has {}s remaining",
            window.remaining_secs
        );
    }

    if window.state == RevealState::NotCheckedIn {
        debug_assert!(
            window.remaining_secs == window.duration_secs,
            "Window not started but only {}s of {}s remaining",
            window.remaining_secs,
            window.duration_secs
        );
    }
}

/// Validate that a grant is ready to be persisted
pub fn assert_grant_invariants(grant: &AccessGrant) {
    debug_assert!(
        grant.property_id != Uuid::nil(),
        "Grant {} has nil property_id",
        grant.id
    );

    debug_assert!(
        grant.booking_code == normalize_code(&grant.booking_code),
        "Grant {} booking code {:?} is not normalized",
        grant.id,
        grant.booking_code
    );
}

/// Validate a check-in transition: issuance only happens on pending grants
pub fn assert_check_in_transition(before: &AccessGrant, after: &AccessGrant) {
    debug_assert!(
        !before.checkin_status,
        "Grant {} issued a second time",
        before.id
    );

    debug_assert!(
        after.checkin_status && after.issued_at.is_some(),
        "Grant {} checked in without an issue timestamp",
        after.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(remaining_secs: u32, state: RevealState) -> RevealWindow {
        RevealWindow {
            duration_secs: 1800,
            remaining_secs,
            expired: state == RevealState::Expired,
            state,
        }
    }

    #[test]
    fn test_valid_windows() {
        assert_window_invariants(&window(1800, RevealState::NotCheckedIn));
        assert_window_invariants(&window(12, RevealState::Active));
        assert_window_invariants(&window(0, RevealState::Expired));
    }

    #[test]
    fn test_valid_grant() {
        let grant = AccessGrant::new(Uuid::new_v4(), "Ana", "guest777", "4829");
        assert_grant_invariants(&grant);
    }

    #[test]
    #[should_panic(expected = "still has")]
    fn test_expired_with_time_left() {
        let mut bad = window(0, RevealState::Expired);
        bad.remaining_secs = 30;
        assert_window_invariants(&bad);
    }

    #[test]
    #[should_panic(expected = "not normalized")]
    fn test_unnormalized_booking_code() {
        let mut grant = AccessGrant::new(Uuid::new_v4(), "Ana", "guest777", "4829");
        grant.booking_code = " guest777".to_string();
        assert_grant_invariants(&grant);
    }
}
