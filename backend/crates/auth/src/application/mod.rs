//! Application Layer
//!
//! Use cases and application services.

pub mod auth_service;
pub mod config;
pub mod token;

// Re-exports
pub use auth_service::{AuthService, LoggedIn};
pub use config::AuthConfig;
pub use token::{Claims, IssuedToken, JwtIssuer, TokenError, TokenIssuer};
