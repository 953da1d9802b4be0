//! Owner storage operations

use rusqlite::{params, Connection, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use super::parse::{is_constraint_violation, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{Owner, OwnerRole};

const OWNER_COLUMNS: &str = "id, name, token, token_personalized, email, role";

pub struct OwnerStore<'a> {
    conn: &'a Connection,
}

impl<'a> OwnerStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Owner> {
        Ok(Owner {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            name: row.get(1)?,
            token: row.get(2)?,
            token_personalized: row.get::<_, i32>(3)? != 0,
            email: row.get(4)?,
            role: OwnerRole::from_u8(row.get::<_, u8>(5)?),
        })
    }

    /// Create a new owner
    pub fn create(&self, owner: &Owner) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO owners (id, name, token, token_personalized, email, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    owner.id.to_string(),
                    owner.name,
                    owner.token,
                    owner.token_personalized as i32,
                    owner.email,
                    owner.role as u8,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::InvalidOperation("token already in use".to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Find owner by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Owner>> {
        let sql = format!("SELECT {OWNER_COLUMNS} FROM owners WHERE id = ?1");
        let owner = self
            .conn
            .query_row(&sql, params![id.to_string()], Self::from_row)
            .optional()?;
        Ok(owner)
    }

    /// Find the owner whose token matches exactly (surrounding whitespace ignored)
    #[instrument(skip_all)]
    pub fn authenticate(&self, token: &str) -> Result<Option<Owner>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        let sql = format!("SELECT {OWNER_COLUMNS} FROM owners WHERE token = ?1");
        let owner = self
            .conn
            .query_row(&sql, params![token], Self::from_row)
            .optional()?;
        Ok(owner)
    }

    /// Replace an owner's invite token with one of their choosing
    #[instrument(skip(self, new_token))]
    pub fn personalize_token(&self, owner_id: Uuid, new_token: &str) -> Result<Owner> {
        let new_token = new_token.trim();
        if new_token.is_empty() {
            return Err(Error::InvalidOperation("token must not be empty".to_string()));
        }

        let changed = self
            .conn
            .execute(
                "UPDATE owners SET token = ?2, token_personalized = 1 WHERE id = ?1",
                params![owner_id.to_string(), new_token],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::InvalidOperation("token already in use".to_string())
                } else {
                    e.into()
                }
            })?;

        if changed == 0 {
            return Err(Error::NotFound(format!("owner {owner_id}")));
        }

        info!(%owner_id, "Owner token personalized");
        self.find_by_id(owner_id)?
            .ok_or_else(|| Error::NotFound(format!("owner {owner_id}")))
    }

    /// List all owners by name
    pub fn list(&self) -> Result<Vec<Owner>> {
        let sql = format!("SELECT {OWNER_COLUMNS} FROM owners ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let owners = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(owners)
    }

    /// Number of owners
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM owners", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete owner (and, by cascade, their properties and grants)
    pub fn delete(&self, owner_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM owners WHERE id = ?1",
            params![owner_id.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Owner, OwnerRole};
    use crate::storage::Database;
    use crate::Error;

    #[test]
    fn test_authenticate_trims_and_matches_exactly() {
        let db = Database::open_in_memory().unwrap();
        let owner = Owner::new("Admin", "ADMIN2024", OwnerRole::SuperAdmin);
        db.owners().create(&owner).unwrap();

        let found = db.owners().authenticate("  ADMIN2024 ").unwrap().unwrap();
        assert_eq!(found.id, owner.id);
        assert_eq!(found.role, OwnerRole::SuperAdmin);

        assert!(db.owners().authenticate("admin2024").unwrap().is_none());
        assert!(db.owners().authenticate("   ").unwrap().is_none());
    }

    #[test]
    fn test_personalize_token() {
        let db = Database::open_in_memory().unwrap();
        let owner = Owner::invite("Marta");
        let other = Owner::new("Luis", "TAKEN", OwnerRole::Owner);
        db.owners().create(&owner).unwrap();
        db.owners().create(&other).unwrap();

        let err = db.owners().personalize_token(owner.id, "TAKEN").unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let err = db.owners().personalize_token(owner.id, "  ").unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let updated = db.owners().personalize_token(owner.id, " marta-key ").unwrap();
        assert_eq!(updated.token, "marta-key");
        assert!(updated.token_personalized);
        assert!(db.owners().authenticate(&owner.token).unwrap().is_none());
    }

    #[test]
    fn test_personalize_unknown_owner() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .owners()
            .personalize_token(uuid::Uuid::new_v4(), "fresh")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
