//! Time-gated door code reveal
//!
//! The reveal window is anchored on the grant's `issued_at` timestamp and is
//! recomputed from that anchor on every evaluation. Nothing about the countdown
//! itself is persisted, so a restarted process derives exactly the same
//! remaining time as the one that was running before.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invariants::assert_window_invariants;
use crate::models::AccessGrant;

/// Default reveal window: 30 minutes
pub const DEFAULT_REVEAL_SECS: u32 = 1800;

/// Placeholder shown in place of an expired door code
pub const REDACTED_CREDENTIAL: &str = "****";

/// Naive timestamp layouts accepted for legacy records (interpreted as UTC)
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// When a grant's door code was issued.
///
/// Upstream records carry either epoch milliseconds or a date string. Both are
/// normalized here once, when the record enters the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIssuedAt", into = "String")]
pub enum IssuedAt {
    /// A usable anchor
    Instant(DateTime<Utc>),
    /// Present but unparseable; kept verbatim so the record round-trips
    Malformed(String),
}

impl IssuedAt {
    pub fn from_epoch_millis(millis: i64) -> Self {
        match DateTime::from_timestamp_millis(millis) {
            Some(at) => Self::Instant(at),
            None => Self::Malformed(millis.to_string()),
        }
    }

    /// Parse a stored or received timestamp string.
    ///
    /// Returns `None` for a blank value (no anchor at all). Numeric strings are
    /// epoch milliseconds; anything else is tried as RFC 3339 and then as a
    /// naive UTC date-time.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(millis) = s.parse::<i64>() {
            return Some(Self::from_epoch_millis(millis));
        }

        if let Ok(value) = s.parse::<f64>() {
            if value.is_finite() {
                return Some(Self::from_epoch_millis(value.trunc() as i64));
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Instant(dt.with_timezone(&Utc)));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Some(Self::Instant(naive.and_utc()));
            }
        }

        Some(Self::Malformed(s.to_string()))
    }

    /// The anchor, if this timestamp is usable
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(at) => Some(*at),
            Self::Malformed(_) => None,
        }
    }

    /// Epoch milliseconds, the canonical stored form
    pub fn epoch_millis(&self) -> Option<i64> {
        self.instant().map(|at| at.timestamp_millis())
    }
}

impl From<DateTime<Utc>> for IssuedAt {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Instant(at)
    }
}

impl From<IssuedAt> for String {
    fn from(issued: IssuedAt) -> Self {
        match issued {
            IssuedAt::Instant(at) => at.to_rfc3339(),
            IssuedAt::Malformed(raw) => raw,
        }
    }
}

/// Wire shapes accepted for `issued_at`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIssuedAt {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl From<RawIssuedAt> for IssuedAt {
    fn from(raw: RawIssuedAt) -> Self {
        match raw {
            RawIssuedAt::Millis(millis) => Self::from_epoch_millis(millis),
            RawIssuedAt::Fractional(value) if value.is_finite() => {
                Self::from_epoch_millis(value.trunc() as i64)
            }
            RawIssuedAt::Fractional(value) => Self::Malformed(value.to_string()),
            RawIssuedAt::Text(text) => {
                Self::parse(&text).unwrap_or(Self::Malformed(text))
            }
        }
    }
}

/// Reveal window configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPolicy {
    pub duration_secs: u32,
}

impl Default for RevealPolicy {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_REVEAL_SECS,
        }
    }
}

/// Seconds of reveal time left for a grant at `now`.
///
/// A grant that has not checked in, or whose anchor is missing or malformed,
/// gets the full duration. The result is always within `[0, duration]`.
pub fn compute_remaining(grant: &AccessGrant, policy: &RevealPolicy, now: DateTime<Utc>) -> u32 {
    let duration = policy.duration_secs;

    if !grant.checkin_status {
        return duration;
    }

    let Some(issued_at) = grant.issued_at.as_ref().and_then(IssuedAt::instant) else {
        return duration;
    };

    let elapsed_secs = (now - issued_at).num_milliseconds().div_euclid(1000);
    let remaining = i64::from(duration) - elapsed_secs;

    remaining.clamp(0, i64::from(duration)) as u32
}

/// Lifecycle of a grant's reveal window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealState {
    NotCheckedIn,
    Active,
    Expired,
}

/// Derived view of a grant's reveal window at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealWindow {
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub expired: bool,
    pub state: RevealState,
}

impl RevealWindow {
    pub fn evaluate(grant: &AccessGrant, policy: &RevealPolicy, now: DateTime<Utc>) -> Self {
        let remaining_secs = compute_remaining(grant, policy, now);

        let state = if !grant.checkin_status {
            RevealState::NotCheckedIn
        } else if remaining_secs == 0 {
            RevealState::Expired
        } else {
            RevealState::Active
        };

        let window = Self {
            duration_secs: policy.duration_secs,
            remaining_secs,
            expired: state == RevealState::Expired,
            state,
        };
        assert_window_invariants(&window);
        window
    }

    fn expired(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: 0,
            expired: true,
            state: RevealState::Expired,
        }
    }

    /// Remaining time as `MM:SS`
    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

/// Sticky-expiry tracker for a single grant.
///
/// Once a window has been observed expired it stays expired for the same
/// anchor, even if the wall clock later steps backwards. Observing a grant with
/// a different anchor starts over.
#[derive(Debug, Clone)]
pub struct RevealTracker {
    policy: RevealPolicy,
    anchor: Option<IssuedAt>,
    expired: bool,
}

impl RevealTracker {
    pub fn new(policy: RevealPolicy) -> Self {
        Self {
            policy,
            anchor: None,
            expired: false,
        }
    }

    pub fn observe(&mut self, grant: &AccessGrant, now: DateTime<Utc>) -> RevealWindow {
        if self.anchor != grant.issued_at {
            self.anchor = grant.issued_at.clone();
            self.expired = false;
        }

        if self.expired && grant.checkin_status {
            return RevealWindow::expired(self.policy.duration_secs);
        }

        let window = RevealWindow::evaluate(grant, &self.policy, now);
        if window.expired {
            self.expired = true;
        }
        window
    }
}

/// Placeholder for an expired door code. Carries no information about the
/// real code.
pub fn redacted_credential() -> &'static str {
    REDACTED_CREDENTIAL
}

/// What the display surface may show for the door code
pub fn display_credential<'a>(grant: &'a AccessGrant, window: &RevealWindow) -> Option<&'a str> {
    match window.state {
        RevealState::NotCheckedIn => None,
        RevealState::Active => Some(grant.door_code.as_str()),
        RevealState::Expired => Some(redacted_credential()),
    }
}

/// Format seconds as `MM:SS`
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
