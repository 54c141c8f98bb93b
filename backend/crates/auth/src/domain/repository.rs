//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use std::future::Future;

use crate::domain::user::{NewUser, User};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find a user by email, ignoring case
    ///
    /// Misses are `AuthError::UserNotFound`.
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User>;

    /// Insert a user and return it with its generated id and timestamps
    ///
    /// A duplicate email is `AuthError::EmailTaken`.
    async fn create_user(&self, user: NewUser) -> AuthResult<User>;
}

/// Root store
///
/// Hands out the per-entity repositories and runs units of work.
pub trait Store: Clone + Send + Sync + 'static {
    type Users: UserRepository + Sync;

    /// Store bound to one open transaction
    type Tx: Store;

    fn users(&self) -> &Self::Users;

    /// Run `f` inside a transaction
    ///
    /// `f` receives a transaction-scoped store. `Ok` commits, `Err` rolls
    /// back; either way the outcome of `f` is returned unless finishing the
    /// transaction itself fails.
    fn do_in_transaction<F, Fut, T>(&self, f: F) -> impl Future<Output = AuthResult<T>> + Send
    where
        F: FnOnce(Self::Tx) -> Fut + Send,
        Fut: Future<Output = AuthResult<T>> + Send,
        T: Send;
}
