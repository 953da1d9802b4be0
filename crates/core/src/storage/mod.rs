//! SQLite storage layer for Concierge

mod grants;
mod migrations;
mod owners;
mod parse;
mod properties;
mod traits;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AccessGrant, Owner, OwnerRole, Property};
use rusqlite::Connection;
use std::path::Path;
use tracing::{info, instrument};

pub use grants::{CheckInOutcome, GrantStore};
pub use owners::OwnerStore;
pub use properties::PropertyStore;
pub use traits::{GrantRepository, OwnerRepository, PropertyRepository, Storage};

/// Token of the owner created by [`Database::seed_demo`]
pub const DEMO_OWNER_TOKEN: &str = "ADMIN2024";
/// Booking code of the grant created by [`Database::seed_demo`]
pub const DEMO_BOOKING_CODE: &str = "GUEST777";
/// Door code of the grant created by [`Database::seed_demo`]
pub const DEMO_DOOR_CODE: &str = "4829";

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get owner store
    pub fn owners(&self) -> OwnerStore<'_> {
        OwnerStore::new(&self.conn)
    }

    /// Get property store
    pub fn properties(&self) -> PropertyStore<'_> {
        PropertyStore::new(&self.conn)
    }

    /// Get access grant store
    pub fn grants(&self) -> GrantStore<'_> {
        GrantStore::new(&self.conn)
    }

    /// Populate an empty database with a demo owner, property and guest.
    ///
    /// Returns false (and changes nothing) if any owner already exists.
    #[instrument(skip(self, now))]
    pub fn seed_demo(&self, now: DateTime<Utc>) -> Result<bool> {
        if self.owners().count()? > 0 {
            return Ok(false);
        }

        let mut owner = Owner::new("Main Admin", DEMO_OWNER_TOKEN, OwnerRole::SuperAdmin);
        owner.token_personalized = true;

        let mut property = Property::draft(&owner);
        property.building_name = "Demo Apartment".to_string();
        property.wifi_ssid = "Demo-WiFi".to_string();
        property.wifi_pass = "welcome123".to_string();

        let today = now.date_naive();
        let grant = AccessGrant::new(property.id, "Demo Guest", DEMO_BOOKING_CODE, DEMO_DOOR_CODE)
            .with_stay(today, today + Duration::days(5));

        let tx = self.conn.unchecked_transaction()?;
        self.owners().create(&owner)?;
        self.properties().create(&property)?;
        self.grants().create(&grant)?;
        tx.commit()?;

        info!(property_id = %property.id, "Seeded demo data");
        Ok(true)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl OwnerRepository for Database {
    fn create_owner(&self, owner: &Owner) -> Result<()> {
        self.owners().create(owner)
    }

    fn find_owner_by_id(&self, id: Uuid) -> Result<Option<Owner>> {
        self.owners().find_by_id(id)
    }

    fn authenticate_owner(&self, token: &str) -> Result<Option<Owner>> {
        self.owners().authenticate(token)
    }

    fn personalize_owner_token(&self, owner_id: Uuid, new_token: &str) -> Result<Owner> {
        self.owners().personalize_token(owner_id, new_token)
    }

    fn list_owners(&self) -> Result<Vec<Owner>> {
        self.owners().list()
    }

    fn delete_owner(&self, owner_id: Uuid) -> Result<()> {
        self.owners().delete(owner_id)
    }
}

impl PropertyRepository for Database {
    fn create_property(&self, property: &Property) -> Result<()> {
        self.properties().create(property)
    }

    fn find_property_by_id(&self, id: Uuid) -> Result<Option<Property>> {
        self.properties().find_by_id(id)
    }

    fn update_property(&self, property: &Property) -> Result<()> {
        self.properties().update(property)
    }

    fn list_properties_for_owner(&self, owner_id: Uuid) -> Result<Vec<Property>> {
        self.properties().list_for_owner(owner_id)
    }

    fn delete_property(&self, property_id: Uuid) -> Result<()> {
        self.properties().delete(property_id)
    }
}

impl GrantRepository for Database {
    fn create_grant(&self, grant: &AccessGrant) -> Result<()> {
        self.grants().create(grant)
    }

    fn find_grant_by_id(&self, id: Uuid) -> Result<Option<AccessGrant>> {
        self.grants().find_by_id(id)
    }

    fn find_grant_by_booking_code(&self, code: &str) -> Result<Option<AccessGrant>> {
        self.grants().find_by_booking_code(code)
    }

    fn list_grants_for_property(&self, property_id: Uuid) -> Result<Vec<AccessGrant>> {
        self.grants().list_for_property(property_id)
    }

    fn update_grant_details(&self, grant: &AccessGrant) -> Result<()> {
        self.grants().update_details(grant)
    }

    fn check_in(&self, grant_id: Uuid, now: DateTime<Utc>) -> Result<CheckInOutcome> {
        self.grants().check_in(grant_id, now)
    }

    fn delete_grant(&self, grant_id: Uuid) -> Result<()> {
        self.grants().delete(grant_id)
    }
}
