//! Access Token Issuer
//!
//! HS512-signed JWTs carrying `{exp, email, uuid}`. Tokens are stateless:
//! there is no refresh flow and no revocation list, so a token stays valid
//! until `exp`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::user::{User, UserId};
use kernel::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Claim set of an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, unix seconds
    pub exp: i64,
    pub email: String,
    /// Subject user id
    pub uuid: String,
}

impl Claims {
    /// Identity named by the token
    pub fn identity(&self) -> Result<Identity, TokenError> {
        let id = Uuid::parse_str(&self.uuid)
            .map_err(|e| TokenError::Malformed(format!("uuid claim: {e}")))?;
        Ok(Identity::new(UserId::from_uuid(id), self.email.clone()))
    }
}

/// Signed token plus its absolute expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<IssuedToken, TokenError>;

    /// Check signature and expiry (no leeway)
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS512 JWT issuer over a shared secret
#[derive(Clone)]
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let id = user
            .id
            .ok_or_else(|| TokenError::Encoding("user has no id".to_string()))?;

        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::Encoding(format!("token lifetime {:?} out of range", self.ttl))
            })?;

        let claims = Claims {
            exp: expires_at.timestamp(),
            email: user.email.clone(),
            uuid: id.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}
