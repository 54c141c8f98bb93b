//! PostgreSQL Repository Implementations
//!
//! [`PgStore`] runs queries on the shared pool; [`PgTxStore`] runs them on
//! one open transaction. Both go through the same executor-generic query
//! functions so the SQL exists once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::repository::{Store, UserRepository};
use crate::domain::user::{NewUser, User, UserId};
use crate::error::{AuthError, AuthResult};

// ============================================================================
// Queries
// ============================================================================

async fn select_user_by_email<'e, E>(executor: E, email: &str) -> AuthResult<User>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT
            id,
            email,
            password,
            created_at,
            updated_at
        FROM users
        WHERE lower(email) = lower($1)
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;

    row.map(UserRow::into_user).ok_or(AuthError::UserNotFound)
}

async fn insert_user<'e, E>(executor: E, user: NewUser) -> AuthResult<User>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (
            email,
            password
        ) VALUES ($1, $2)
        RETURNING
            id,
            email,
            password,
            created_at,
            updated_at
        "#,
    )
    .bind(&user.email)
    .bind(user.password_hash.as_phc_string())
    .fetch_one(executor)
    .await
    .map_err(map_insert_error)?;

    tracing::info!(user_id = %row.id, "User created");

    Ok(row.into_user())
}

fn map_insert_error(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::Database(err),
    }
}

// ============================================================================
// Pool-backed store
// ============================================================================

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgStore {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        select_user_by_email(&self.pool, email).await
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        insert_user(&self.pool, user).await
    }
}

impl Store for PgStore {
    type Users = Self;
    type Tx = PgTxStore;

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
        let pool = self.pool.clone();

        async move {
            let shared = Arc::new(Mutex::new(pool.begin().await?));

            let result = f(PgTxStore {
                tx: Arc::clone(&shared),
            })
            .await;

            // Dropping an unfinished transaction rolls it back.
            let tx = Arc::try_unwrap(shared)
                .map_err(|_| {
                    AuthError::Internal("transaction still referenced after unit of work".into())
                })?
                .into_inner();

            match result {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "Transaction rollback failed");
                    }
                    Err(e)
                }
            }
        }
    }
}

// ============================================================================
// Transaction-backed store
// ============================================================================

/// Store bound to one open transaction
///
/// Handed to the closure of [`Store::do_in_transaction`]; clones share the
/// transaction. Nested units of work join the outer transaction.
#[derive(Clone)]
pub struct PgTxStore {
    tx: Arc<Mutex<Transaction<'static, Postgres>>>,
}

impl UserRepository for PgTxStore {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        let mut tx = self.tx.lock().await;
        select_user_by_email(&mut **tx, email).await
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let mut tx = self.tx.lock().await;
        insert_user(&mut **tx, user).await
    }
}

impl Store for PgTxStore {
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
        f(self.clone())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: Some(UserId::from_uuid(self.id)),
            email: self.email,
            password: self.password,
            created_at: self.created_at,
            updated_at: self.updated_at,
            access_token: String::new(),
        }
    }
}
