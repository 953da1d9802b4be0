//! Guest access grant model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reveal::IssuedAt;

/// Ties a guest's stay to a door code and its check-in state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_name: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    /// Guest login code, stored normalized
    pub booking_code: String,
    pub door_code: String,
    /// Monotonic: never reverts once set
    pub checkin_status: bool,
    /// Set exactly once, at check-in
    pub issued_at: Option<IssuedAt>,
}

impl AccessGrant {
    pub fn new(
        property_id: Uuid,
        guest_name: impl Into<String>,
        booking_code: impl AsRef<str>,
        door_code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            guest_name: guest_name.into(),
            check_in: None,
            check_out: None,
            booking_code: normalize_code(booking_code.as_ref()),
            door_code: door_code.into(),
            checkin_status: false,
            issued_at: None,
        }
    }

    pub fn with_stay(mut self, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        self.check_in = Some(check_in);
        self.check_out = Some(check_out);
        self
    }

    /// Whether the stay covers `today`
    pub fn is_stay_active(&self, today: NaiveDate) -> bool {
        match (self.check_in, self.check_out) {
            (Some(start), Some(end)) => start <= today && today <= end,
            _ => false,
        }
    }
}

/// Booking codes are matched ignoring surrounding whitespace and case
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grant_is_pending() {
        let grant = AccessGrant::new(Uuid::new_v4(), "Ana", "  guest777 ", "4829");
        assert_eq!(grant.booking_code, "GUEST777");
        assert!(!grant.checkin_status);
        assert!(grant.issued_at.is_none());
    }

    #[test]
    fn test_stay_window() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let grant = AccessGrant::new(Uuid::new_v4(), "Ana", "X1", "1").with_stay(start, end);

        assert!(grant.is_stay_active(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()));
        assert!(grant.is_stay_active(end));
        assert!(!grant.is_stay_active(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()));
    }
}
