//! Authenticated identity
//!
//! Bound into the request context by the auth guard and read by handlers.

use serde::{Deserialize, Serialize};

use crate::id::{Id, markers};

pub type UserId = Id<markers::User>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
