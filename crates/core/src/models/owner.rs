//! Property owner model

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INVITE_PREFIX: &str = "LUX-";
const INVITE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const INVITE_SUFFIX_LEN: usize = 4;

/// Owner account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OwnerRole {
    /// Manages their own properties
    Owner = 1,
    /// Can invite and remove owners
    SuperAdmin = 2,
}

impl OwnerRole {
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => OwnerRole::SuperAdmin,
            _ => OwnerRole::Owner,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OwnerRole::Owner => "Owner",
            OwnerRole::SuperAdmin => "Super Admin",
        }
    }
}

/// A property owner. Logs in with a plain access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub token: String,
    /// False until the owner replaces the invite token with their own
    pub token_personalized: bool,
    pub email: Option<String>,
    pub role: OwnerRole,
}

impl Owner {
    pub fn new(name: impl Into<String>, token: impl Into<String>, role: OwnerRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            token: token.into(),
            token_personalized: false,
            email: None,
            role,
        }
    }

    /// New owner with a freshly generated invite token
    pub fn invite(name: impl Into<String>) -> Self {
        Self::new(name, generate_invite_token(), OwnerRole::Owner)
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Owners must pick their own token before managing properties
    pub fn needs_token_setup(&self) -> bool {
        !self.token_personalized
    }
}

/// Generate an invite token of the form `LUX-XXXX`
pub fn generate_invite_token() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..INVITE_SUFFIX_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect();
    format!("{INVITE_PREFIX}{suffix}")
}
