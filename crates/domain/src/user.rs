//! User identity, split into a login credential and a domain profile.
//!
//! Both halves share one stable [`UserId`]. The credential mechanism itself
//! (hashing, token signing) lives outside this system; only an already-hashed
//! secret is ever stored here.

use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Display name must not be empty")]
    EmptyDisplayName,

    #[error("Invalid email address: {email:?}")]
    InvalidEmail { email: String },

    #[error("Credential hash must not be empty")]
    EmptyCredential,

    #[error("Unknown role: {value:?}")]
    InvalidRole { value: String },
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AccountError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(AccountError::InvalidRole {
                value: raw.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The domain-facing half of a user: who they are inside the bookstore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
}

impl Profile {
    pub fn new(display_name: &str, role: Role) -> Result<Self, AccountError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AccountError::EmptyDisplayName);
        }
        Ok(Self {
            id: UserId::new(),
            display_name: display_name.to_string(),
            role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Replaces the display name. Blank input leaves the current name in place.
    pub fn rename(&mut self, display_name: &str) -> bool {
        let display_name = display_name.trim();
        if display_name.is_empty() || display_name == self.display_name {
            return false;
        }
        self.display_name = display_name.to_string();
        true
    }
}

/// The login half of a user. Never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
}

impl Credential {
    pub fn new(user_id: UserId, email: &str, password_hash: &str) -> Result<Self, AccountError> {
        let email = normalize_email(email)?;
        if password_hash.trim().is_empty() {
            return Err(AccountError::EmptyCredential);
        }
        Ok(Self {
            user_id,
            email,
            password_hash: password_hash.to_string(),
            active: true,
        })
    }
}

/// Both halves of a user, as administrators see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub profile: Profile,
    pub credential: Credential,
}

impl Account {
    pub fn id(&self) -> UserId {
        self.profile.id
    }

    pub fn email(&self) -> &str {
        &self.credential.email
    }

    /// Deactivated accounts keep their data but may no longer act.
    pub fn is_active(&self) -> bool {
        self.credential.active
    }
}

/// Lower-cases and trims an email, rejecting obviously malformed input.
pub fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AccountError::InvalidEmail {
            email: raw.to_string(),
        }),
    }
}
