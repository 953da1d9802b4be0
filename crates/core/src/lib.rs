//! Concierge Core Library
//!
//! Guest access models, the time-gated door code reveal, and SQLite storage
//! for the Concierge property platform.

pub mod config;
pub mod error;
pub mod history;
pub mod invariants;
pub mod models;
pub mod reveal;
pub mod session;
pub mod storage;

pub use config::ConciergeConfig;
pub use error::{Error, Result};
pub use models::*;
pub use reveal::{
    compute_remaining, display_credential, format_clock, redacted_credential, IssuedAt,
    RevealPolicy, RevealState, RevealTracker, RevealWindow,
};
pub use session::{GuestDashboard, GuestSection, GuestSession};
pub use storage::{
    CheckInOutcome, Database, GrantRepository, OwnerRepository, PropertyRepository, Storage,
};
