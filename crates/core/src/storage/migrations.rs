//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Owners table
            CREATE TABLE IF NOT EXISTS owners (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                token TEXT NOT NULL UNIQUE,
                token_personalized INTEGER NOT NULL DEFAULT 0,
                email TEXT,
                role INTEGER NOT NULL DEFAULT 1
            );

            -- Properties table
            CREATE TABLE IF NOT EXISTS properties (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                building_name TEXT NOT NULL,
                host_name TEXT NOT NULL,
                city TEXT NOT NULL DEFAULT '',
                address TEXT NOT NULL DEFAULT '',
                capacity TEXT NOT NULL DEFAULT '',
                rooms INTEGER NOT NULL DEFAULT 1,
                bathrooms INTEGER NOT NULL DEFAULT 1,
                wifi_ssid TEXT NOT NULL DEFAULT '',
                wifi_pass TEXT NOT NULL DEFAULT '',
                rules TEXT NOT NULL DEFAULT '',
                guides TEXT NOT NULL DEFAULT '',
                checkout_instructions TEXT NOT NULL DEFAULT '',
                whatsapp_contact TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (owner_id) REFERENCES owners(id) ON DELETE CASCADE
            );

            -- Access grants table
            -- issued_at holds epoch milliseconds; legacy rows may hold a date string
            CREATE TABLE IF NOT EXISTS access_grants (
                id TEXT PRIMARY KEY,
                property_id TEXT NOT NULL,
                guest_name TEXT NOT NULL DEFAULT '',
                check_in TEXT,
                check_out TEXT,
                booking_code TEXT NOT NULL UNIQUE,
                door_code TEXT NOT NULL,
                checkin_status INTEGER NOT NULL DEFAULT 0,
                issued_at INTEGER,
                FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for lookups",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_properties_owner ON properties(owner_id);
            CREATE INDEX IF NOT EXISTS idx_grants_property ON access_grants(property_id);
            CREATE INDEX IF NOT EXISTS idx_grants_booking_code ON access_grants(booking_code);
        "#,
    },
    Migration {
        version: 3,
        description: "Add property location for the nearby-places guide",
        sql: r#"
            ALTER TABLE properties ADD COLUMN location_lat REAL;
            ALTER TABLE properties ADD COLUMN location_lng REAL;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }
}
