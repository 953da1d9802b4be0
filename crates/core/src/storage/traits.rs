//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, future remote backend).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::grants::CheckInOutcome;
use crate::error::Result;
use crate::models::{AccessGrant, Owner, Property};

/// Owner repository operations
pub trait OwnerRepository {
    /// Create a new owner
    fn create_owner(&self, owner: &Owner) -> Result<()>;

    /// Find owner by ID
    fn find_owner_by_id(&self, id: Uuid) -> Result<Option<Owner>>;

    /// Find owner by login token
    fn authenticate_owner(&self, token: &str) -> Result<Option<Owner>>;

    /// Replace an owner's token and mark it personalized
    fn personalize_owner_token(&self, owner_id: Uuid, new_token: &str) -> Result<Owner>;

    /// List all owners
    fn list_owners(&self) -> Result<Vec<Owner>>;

    /// Delete an owner
    fn delete_owner(&self, owner_id: Uuid) -> Result<()>;
}

/// Property repository operations
pub trait PropertyRepository {
    /// Create a new property
    fn create_property(&self, property: &Property) -> Result<()>;

    /// Find property by ID
    fn find_property_by_id(&self, id: Uuid) -> Result<Option<Property>>;

    /// Update a property
    fn update_property(&self, property: &Property) -> Result<()>;

    /// List an owner's properties
    fn list_properties_for_owner(&self, owner_id: Uuid) -> Result<Vec<Property>>;

    /// Delete a property
    fn delete_property(&self, property_id: Uuid) -> Result<()>;
}

/// Access record store operations
pub trait GrantRepository {
    /// Create a new grant
    fn create_grant(&self, grant: &AccessGrant) -> Result<()>;

    /// Find grant by ID
    fn find_grant_by_id(&self, id: Uuid) -> Result<Option<AccessGrant>>;

    /// Find grant by booking code
    fn find_grant_by_booking_code(&self, code: &str) -> Result<Option<AccessGrant>>;

    /// List grants for a property
    fn list_grants_for_property(&self, property_id: Uuid) -> Result<Vec<AccessGrant>>;

    /// Update owner-editable grant fields
    fn update_grant_details(&self, grant: &AccessGrant) -> Result<()>;

    /// Check a guest in, issuing the door code
    fn check_in(&self, grant_id: Uuid, now: DateTime<Utc>) -> Result<CheckInOutcome>;

    /// Delete a grant
    fn delete_grant(&self, grant_id: Uuid) -> Result<()>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or a remote service.
pub trait Storage: OwnerRepository + PropertyRepository + GrantRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: OwnerRepository + PropertyRepository + GrantRepository {}
