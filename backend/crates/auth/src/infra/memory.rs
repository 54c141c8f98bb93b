//! In-memory store for tests
//!
//! Mirrors the Postgres semantics that callers depend on: case-insensitive
//! email lookup and uniqueness, server-assigned id and timestamps, and
//! rollback of a failed unit of work.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::domain::repository::{Store, UserRepository};
use crate::domain::user::{NewUser, User, UserId};
use crate::error::{AuthError, AuthResult};

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<Vec<User>>>,
    latency: Option<Duration>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a database-style error
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Every call sleeps for `latency` first
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn enter(&self) -> AuthResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable {
            return Err(AuthError::Internal("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl UserRepository for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        self.enter().await?;

        let wanted = email.to_lowercase();
        self.lock()
            .iter()
            .find(|user| user.email.to_lowercase() == wanted)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        self.enter().await?;

        let mut users = self.lock();
        let wanted = user.email.to_lowercase();
        if users.iter().any(|u| u.email.to_lowercase() == wanted) {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let created = User {
            id: Some(UserId::new()),
            email: user.email,
            password: user.password_hash.into_phc_string(),
            created_at: Some(now),
            updated_at: Some(now),
            access_token: String::new(),
        };
        users.push(created.clone());

        Ok(created)
    }
}

impl Store for MemoryStore {
    type Users = Self;
    type Tx = Self;

    fn users(&self) -> &Self::Users {
        self
    }

    fn do_in_transaction<F, Fut, T>(
        &self,
        f: F,
    ) -> impl Future<Output = AuthResult<T>> + Send
    where
        F: FnOnce(Self::Tx) -> Fut + Send,
        Fut: Future<Output = AuthResult<T>> + Send,
        T: Send,
    {
        let store = self.clone();

        async move {
            let snapshot = store.lock().clone();
            let result = f(store.clone()).await;
            if result.is_err() {
                *store.lock() = snapshot;
            }
            result
        }
    }
}
