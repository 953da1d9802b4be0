//! Application state management

use std::path::Path;

use chrono::{DateTime, Utc};
use concierge_core::config::default_config_path;
use concierge_core::{ConciergeConfig, Database, Error, Owner, OwnerRole, Result};
use tracing::info;

/// Main application state
pub struct AppState {
    pub config: ConciergeConfig,
    pub db: Database,
}

impl AppState {
    /// Load configuration and open the database it points at
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConciergeConfig::load(path)?,
            None => ConciergeConfig::load(&default_config_path()?)?,
        };

        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(path = %db_path.display(), "Opening database");
        let db = Database::open(&db_path)?;

        Ok(Self { config, db })
    }

    /// State backed by an in-memory database
    pub fn in_memory(config: ConciergeConfig) -> Result<Self> {
        Ok(Self {
            config,
            db: Database::open_in_memory()?,
        })
    }

    /// Current wall-clock time
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Resolve an owner token, failing if it does not match anyone
    pub fn require_owner(&self, token: &str) -> Result<Owner> {
        self.db
            .owners()
            .authenticate(token)?
            .ok_or_else(|| Error::Authentication("invalid owner token".to_string()))
    }

    /// Resolve an owner who has finished token setup and may manage properties
    pub fn require_manager(&self, token: &str) -> Result<Owner> {
        let owner = self.require_owner(token)?;
        if owner.needs_token_setup() {
            return Err(Error::Authentication(
                "choose a personal token with `set-token` first".to_string(),
            ));
        }
        Ok(owner)
    }

    /// Resolve an owner token that must belong to a super admin
    pub fn require_super_admin(&self, token: &str) -> Result<Owner> {
        let owner = self.require_owner(token)?;
        if owner.role != OwnerRole::SuperAdmin {
            return Err(Error::Authentication(
                "super admin token required".to_string(),
            ));
        }
        Ok(owner)
    }
}
