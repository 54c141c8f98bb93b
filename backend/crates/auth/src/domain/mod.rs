//! Domain Layer
//!
//! Contains the user entity and the persistence traits.

pub mod repository;
pub mod user;

// Re-exports
pub use repository::{Store, UserRepository};
pub use user::{NewUser, Registration, User, UserId};
