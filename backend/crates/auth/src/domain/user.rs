//! User entity

use std::fmt;

use chrono::{DateTime, Utc};
use platform::password::{ClearTextPassword, HashedPassword};
use serde::Serialize;

pub use kernel::identity::UserId;

/// Persisted user
///
/// `password` holds the PHC hash and never leaves the process.
/// `access_token` is only populated by a successful login.
#[derive(Clone, Serialize)]
pub struct User {
    pub id: Option<UserId>,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,
}

impl User {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"[HASH]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("has_access_token", &!self.access_token.is_empty())
            .finish()
    }
}

/// Signup input before hashing
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: ClearTextPassword,
}

/// Row to insert; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: HashedPassword,
}
