//! Access grant storage operations
//!
//! This is the access record store: it owns `checkin_status` and `issued_at`
//! and is the only writer of either.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::parse::{
    format_date_opt, is_constraint_violation, issued_at_from_sql, issued_at_to_sql, parse_date_opt,
    parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::invariants::{assert_check_in_transition, assert_grant_invariants};
use crate::models::{normalize_code, AccessGrant};

const GRANT_COLUMNS: &str = "id, property_id, guest_name, check_in, check_out, booking_code, \
     door_code, checkin_status, issued_at";

/// Result of a check-in request
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    /// The door code was issued just now
    Issued(AccessGrant),
    /// The grant was already checked in; nothing changed
    AlreadyActive(AccessGrant),
}

impl CheckInOutcome {
    pub fn grant(&self) -> &AccessGrant {
        match self {
            CheckInOutcome::Issued(grant) | CheckInOutcome::AlreadyActive(grant) => grant,
        }
    }

    pub fn into_grant(self) -> AccessGrant {
        match self {
            CheckInOutcome::Issued(grant) | CheckInOutcome::AlreadyActive(grant) => grant,
        }
    }
}

pub struct GrantStore<'a> {
    conn: &'a Connection,
}

impl<'a> GrantStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<AccessGrant> {
        Ok(AccessGrant {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            property_id: parse_uuid(&row.get::<_, String>(1)?)?,
            guest_name: row.get(2)?,
            check_in: parse_date_opt(row.get(3)?)?,
            check_out: parse_date_opt(row.get(4)?)?,
            booking_code: row.get(5)?,
            door_code: row.get(6)?,
            checkin_status: row.get::<_, i32>(7)? != 0,
            issued_at: issued_at_from_sql(row.get_ref(8)?),
        })
    }

    fn map_write_error(e: rusqlite::Error) -> Error {
        if is_constraint_violation(&e) {
            Error::InvalidOperation("booking code already in use".to_string())
        } else {
            e.into()
        }
    }

    /// Create a new grant
    pub fn create(&self, grant: &AccessGrant) -> Result<()> {
        assert_grant_invariants(grant);
        self.conn
            .execute(
                &format!(
                    "INSERT INTO access_grants ({GRANT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    grant.id.to_string(),
                    grant.property_id.to_string(),
                    grant.guest_name,
                    format_date_opt(grant.check_in),
                    format_date_opt(grant.check_out),
                    normalize_code(&grant.booking_code),
                    grant.door_code,
                    grant.checkin_status as i32,
                    issued_at_to_sql(grant.issued_at.as_ref()),
                ],
            )
            .map_err(Self::map_write_error)?;
        Ok(())
    }

    /// Find grant by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<AccessGrant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM access_grants WHERE id = ?1");
        let grant = self
            .conn
            .query_row(&sql, params![id.to_string()], Self::from_row)
            .optional()?;
        Ok(grant)
    }

    /// Find grant by the guest's booking code, ignoring case and whitespace
    #[instrument(skip_all)]
    pub fn find_by_booking_code(&self, code: &str) -> Result<Option<AccessGrant>> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants WHERE UPPER(TRIM(booking_code)) = ?1"
        );
        let grant = self
            .conn
            .query_row(&sql, params![code], Self::from_row)
            .optional()?;
        Ok(grant)
    }

    /// List grants for a property, latest stay first
    pub fn list_for_property(&self, property_id: Uuid) -> Result<Vec<AccessGrant>> {
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants WHERE property_id = ?1
             ORDER BY check_in IS NULL, check_in DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let grants = stmt
            .query_map(params![property_id.to_string()], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(grants)
    }

    /// Update the owner-editable fields. Check-in state is left untouched.
    pub fn update_details(&self, grant: &AccessGrant) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE access_grants SET guest_name = ?2, check_in = ?3, check_out = ?4,
                     booking_code = ?5, door_code = ?6
                 WHERE id = ?1",
                params![
                    grant.id.to_string(),
                    grant.guest_name,
                    format_date_opt(grant.check_in),
                    format_date_opt(grant.check_out),
                    normalize_code(&grant.booking_code),
                    grant.door_code,
                ],
            )
            .map_err(Self::map_write_error)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("grant {}", grant.id)));
        }
        Ok(())
    }

    /// Check the guest in, issuing the door code at `now`.
    ///
    /// Issuance happens once per grant. Repeating the request leaves the
    /// original `issued_at` in place and reports `AlreadyActive`.
    #[instrument(skip(self, now))]
    pub fn check_in(&self, grant_id: Uuid, now: DateTime<Utc>) -> Result<CheckInOutcome> {
        let before = self
            .find_by_id(grant_id)?
            .ok_or_else(|| Error::NotFound(format!("grant {grant_id}")))?;

        if before.checkin_status {
            warn!(%grant_id, "Check-in repeated; keeping original issue time");
            return Ok(CheckInOutcome::AlreadyActive(before));
        }

        let changed = self.conn.execute(
            "UPDATE access_grants SET checkin_status = 1, issued_at = ?2
             WHERE id = ?1 AND checkin_status = 0",
            params![grant_id.to_string(), now.timestamp_millis()],
        )?;

        let after = self
            .find_by_id(grant_id)?
            .ok_or_else(|| Error::NotFound(format!("grant {grant_id}")))?;

        if changed == 0 {
            return Ok(CheckInOutcome::AlreadyActive(after));
        }

        assert_check_in_transition(&before, &after);
        info!(%grant_id, issued_at = %now.to_rfc3339(), "Door code issued");
        Ok(CheckInOutcome::Issued(after))
    }

    /// Delete grant
    pub fn delete(&self, grant_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM access_grants WHERE id = ?1",
            params![grant_id.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Owner, OwnerRole, Property};
    use crate::reveal::{compute_remaining, IssuedAt, RevealPolicy};
    use crate::storage::Database;
    use chrono::{Duration, NaiveDate, TimeZone};
    use tempfile::tempdir;

    fn setup(db: &Database) -> Property {
        let owner = Owner::new("Host", format!("TOKEN-{}", Uuid::new_v4()), OwnerRole::Owner);
        db.owners().create(&owner).unwrap();
        let property = Property::draft(&owner);
        db.properties().create(&property).unwrap();
        property
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_find_by_booking_code_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let grant = AccessGrant::new(property.id, "Ana", "Guest777", "4829");
        db.grants().create(&grant).unwrap();

        let found = db.grants().find_by_booking_code("  guest777\n").unwrap().unwrap();
        assert_eq!(found.id, grant.id);
        assert_eq!(found.booking_code, "GUEST777");
        assert!(db.grants().find_by_booking_code("GUEST778").unwrap().is_none());
        assert!(db.grants().find_by_booking_code("").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_booking_code_rejected() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        db.grants()
            .create(&AccessGrant::new(property.id, "Ana", "SAME", "1"))
            .unwrap();

        let err = db
            .grants()
            .create(&AccessGrant::new(property.id, "Luis", "same", "2"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_check_in_issues_once() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let grant = AccessGrant::new(property.id, "Ana", "GUEST777", "4829");
        db.grants().create(&grant).unwrap();

        let first = db.grants().check_in(grant.id, t0()).unwrap();
        assert!(matches!(first, CheckInOutcome::Issued(_)));
        assert!(first.grant().checkin_status);
        assert_eq!(first.grant().issued_at, Some(IssuedAt::Instant(t0())));

        let again = db.grants().check_in(grant.id, t0() + Duration::minutes(20)).unwrap();
        assert!(matches!(again, CheckInOutcome::AlreadyActive(_)));
        assert_eq!(again.grant().issued_at, Some(IssuedAt::Instant(t0())));
    }

    #[test]
    fn test_check_in_unknown_grant() {
        let db = Database::open_in_memory().unwrap();
        let err = db.grants().check_in(Uuid::new_v4(), t0()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_update_details_keeps_check_in_state() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let grant = AccessGrant::new(property.id, "Ana", "GUEST777", "4829");
        db.grants().create(&grant).unwrap();
        db.grants().check_in(grant.id, t0()).unwrap();

        // Owner edits a stale copy that still says "not checked in"
        let mut edited = grant.clone();
        edited.guest_name = "Ana Ruiz".to_string();
        edited.door_code = "1111".to_string();
        db.grants().update_details(&edited).unwrap();

        let loaded = db.grants().find_by_id(grant.id).unwrap().unwrap();
        assert_eq!(loaded.guest_name, "Ana Ruiz");
        assert_eq!(loaded.door_code, "1111");
        assert!(loaded.checkin_status);
        assert_eq!(loaded.issued_at, Some(IssuedAt::Instant(t0())));
    }

    #[test]
    fn test_list_for_property_latest_stay_first() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let date = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();

        let older = AccessGrant::new(property.id, "A", "OLD", "1").with_stay(date(1), date(3));
        let newer = AccessGrant::new(property.id, "B", "NEW", "2").with_stay(date(10), date(12));
        let draft = AccessGrant::new(property.id, "C", "DRAFT", "3");
        db.grants().create(&older).unwrap();
        db.grants().create(&draft).unwrap();
        db.grants().create(&newer).unwrap();

        let codes: Vec<_> = db
            .grants()
            .list_for_property(property.id)
            .unwrap()
            .into_iter()
            .map(|g| g.booking_code)
            .collect();
        assert_eq!(codes, vec!["NEW", "OLD", "DRAFT"]);
    }

    #[test]
    fn test_legacy_text_timestamps_are_normalized() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let iso = AccessGrant::new(property.id, "A", "ISO", "1");
        let junk = AccessGrant::new(property.id, "B", "JUNK", "2");
        db.grants().create(&iso).unwrap();
        db.grants().create(&junk).unwrap();

        db.conn
            .execute(
                "UPDATE access_grants SET checkin_status = 1, issued_at = ?2 WHERE id = ?1",
                params![iso.id.to_string(), "2023-11-14T22:13:20Z"],
            )
            .unwrap();
        db.conn
            .execute(
                "UPDATE access_grants SET checkin_status = 1, issued_at = ?2 WHERE id = ?1",
                params![junk.id.to_string(), "17/10/2026, 14:03:22"],
            )
            .unwrap();

        let policy = RevealPolicy::default();
        let iso = db.grants().find_by_id(iso.id).unwrap().unwrap();
        assert_eq!(iso.issued_at, Some(IssuedAt::Instant(t0())));
        assert_eq!(compute_remaining(&iso, &policy, t0() + Duration::seconds(10)), 1790);

        let junk = db.grants().find_by_id(junk.id).unwrap().unwrap();
        assert!(matches!(junk.issued_at, Some(IssuedAt::Malformed(_))));
        assert_eq!(compute_remaining(&junk, &policy, t0()), 1800);
    }

    #[test]
    fn test_malformed_issue_time_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let property = setup(&db);
        let mut grant = AccessGrant::new(property.id, "C", "LEGACY", "3");
        grant.checkin_status = true;
        grant.issued_at = IssuedAt::parse("17/10/2026, 14:03:22");
        db.grants().create(&grant).unwrap();

        let loaded = db.grants().find_by_id(grant.id).unwrap().unwrap();
        assert_eq!(
            loaded.issued_at,
            Some(IssuedAt::Malformed("17/10/2026, 14:03:22".to_string()))
        );
        assert_eq!(loaded, grant);
    }

    #[test]
    fn test_issue_time_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("concierge.db");
        let policy = RevealPolicy::default();
        let now = t0() + Duration::seconds(10);

        let grant_id = {
            let db = Database::open(&path).unwrap();
            let property = setup(&db);
            let grant = AccessGrant::new(property.id, "Ana", "GUEST777", "4829");
            db.grants().create(&grant).unwrap();
            let issued = db.grants().check_in(grant.id, t0()).unwrap().into_grant();
            assert_eq!(compute_remaining(&issued, &policy, now), 1790);
            grant.id
        };

        let db = Database::open(&path).unwrap();
        let reloaded = db.grants().find_by_id(grant_id).unwrap().unwrap();
        assert_eq!(compute_remaining(&reloaded, &policy, now), 1790);
    }
}
