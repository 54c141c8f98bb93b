//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - User entity and store traits
//! - `application/` - Auth service, token issuing, configuration
//! - `infra/` - Postgres store (and an in-memory store for tests)
//! - `presentation/` - HTTP handlers, DTOs, router, guard middleware
//!
//! ## Features
//! - Login with email + password, answered with a signed access token
//! - Signup with a case-insensitively unique email
//! - Access token carried in an `access_token` cookie or a bearer header
//! - Stateless logout (the cookie is cleared)
//!
//! ## Security Model
//! - Passwords hashed with Argon2id
//! - Access tokens are HS512 JWTs with an absolute expiry
//! - Unknown email and wrong password are indistinguishable to the caller

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::{AuthConfig, AuthService, JwtIssuer, TokenIssuer};
pub use domain::{Store, User, UserRepository};
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgStore;
pub use presentation::router::auth_router;
