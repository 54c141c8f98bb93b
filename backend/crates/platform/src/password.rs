//! Password Hashing and Verification
//!
//! Argon2id hashing behind the [`PasswordHasher`] seam so callers can swap the
//! algorithm (or use a cheap hasher in tests) without touching business code.
//!
//! - Clear text is zeroized on drop and redacted in `Debug`
//! - Hashes are stored as self-describing PHC strings
//! - Verification never errors: anything but a match is `false`

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Error Types
// ============================================================================

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hash format
    #[error("Invalid password hash format")]
    InvalidHashFormat,

    /// Hasher parameters rejected
    #[error("Invalid hasher parameters: {0}")]
    InvalidParams(String),
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// No policy is enforced here; the login path must accept whatever the user
/// typed and let verification decide.
///
/// ## Examples
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("my_secure_password");
/// assert_eq!(password.len(), 18);
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

impl From<String> for ClearTextPassword {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Well-formed Argon2id PHC string (default cost) that matches no password
///
/// Verify against it when there is no stored hash so the caller still pays
/// for one full Argon2 run.
pub const DUMMY_PHC_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hashed password in PHC string format
///
/// The PHC string carries algorithm, version, parameters and salt, so a hash
/// produced with one parameter set still verifies after the defaults change.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    pub fn into_phc_string(self) -> String {
        self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Hasher seam
// ============================================================================

/// One-way password hashing
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError>;

    /// `true` only when `password` matches the stored `hashed` value.
    /// Malformed hashes verify as `false`.
    fn verify(&self, password: &ClearTextPassword, hashed: &str) -> bool;
}

/// Argon2id hasher
///
/// `Argon2Hasher::default()` uses the crate's OWASP-recommended parameters
/// (m=19456 KiB, t=2, p=1).
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Explicit cost parameters (memory in KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordHashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Hasher").finish_non_exhaustive()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    fn verify(&self, password: &ClearTextPassword, hashed: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hashed) {
            Ok(h) => h,
            Err(_) => return false,
        };

        // Argon2 uses constant-time comparison internally
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal cost so the suite stays fast
    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let password = ClearTextPassword::new("TestPassword123!");
        let hashed = hasher.hash(&password).unwrap();

        assert!(hashed.as_phc_string().starts_with("$argon2id$"));
        assert!(hasher.verify(&password, hashed.as_phc_string()));

        let wrong_password = ClearTextPassword::new("WrongPassword123!");
        assert!(!hasher.verify(&wrong_password, hashed.as_phc_string()));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = fast_hasher();
        let password = ClearTextPassword::new("same");
        let a = hasher.hash(&password).unwrap();
        let b = hasher.hash(&password).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_across_parameter_sets() {
        let password = ClearTextPassword::new("portable");
        let hashed = fast_hasher().hash(&password).unwrap();

        // Parameters are read from the PHC string, not the verifier
        assert!(Argon2Hasher::default().verify(&password, hashed.as_phc_string()));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        let hasher = fast_hasher();
        let password = ClearTextPassword::new("anything");
        assert!(!hasher.verify(&password, "not_a_valid_hash"));
        assert!(!hasher.verify(&password, ""));
    }

    #[test]
    fn test_empty_password_is_hashable() {
        let hasher = fast_hasher();
        let password = ClearTextPassword::new("");
        let hashed = hasher.hash(&password).unwrap();
        assert!(hasher.verify(&password, hashed.as_phc_string()));
        assert!(!hasher.verify(&ClearTextPassword::new(" "), hashed.as_phc_string()));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let hasher = fast_hasher();
        let password = ClearTextPassword::new("TestPassword123!");
        let hashed = hasher.hash(&password).unwrap();

        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert_eq!(restored, hashed);
    }

    #[test]
    fn test_dummy_hash_is_well_formed_and_never_matches() {
        let parsed = PasswordHash::new(DUMMY_PHC_HASH).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert!(HashedPassword::from_phc_string(DUMMY_PHC_HASH).is_ok());

        let hasher = fast_hasher();
        assert!(!hasher.verify(&ClearTextPassword::new(""), DUMMY_PHC_HASH));
        assert!(!hasher.verify(&ClearTextPassword::new("somesalt"), DUMMY_PHC_HASH));
    }

    #[test]
    fn test_invalid_phc_string() {
        let result = HashedPassword::from_phc_string("not_a_valid_hash");
        assert!(matches!(result, Err(PasswordHashError::InvalidHashFormat)));
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            Argon2Hasher::with_params(0, 0, 0),
            Err(PasswordHashError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new("secret");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }
}
