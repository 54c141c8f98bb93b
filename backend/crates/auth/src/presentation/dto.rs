//! API DTOs (Data Transfer Objects)

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

// ============================================================================
// Credentials
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Both fields are required; their content is left to the credential check
    pub fn validate(&self) -> AuthResult<()> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

/// Signup request
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> AuthResult<()> {
        require("email", &self.email)?;
        require("password", &self.password)?;

        if !is_plausible_email(self.email.trim()) {
            return Err(AuthError::Validation("invalid email format".to_string()));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> AuthResult<()> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Exactly one `@`, non-empty local part, dotted domain
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
