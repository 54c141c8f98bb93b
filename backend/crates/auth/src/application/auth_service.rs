//! Auth Service
//!
//! Login, signup and lookup over an injected store, password hasher and
//! token issuer. Every store call is bounded by the deadline carried in the
//! request context.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::identity::Identity;
use monitoring::RequestContext;
use platform::password::{ClearTextPassword, DUMMY_PHC_HASH, PasswordHasher};

use crate::application::token::TokenIssuer;
use crate::domain::repository::{Store, UserRepository};
use crate::domain::user::{NewUser, Registration, User};
use crate::error::{AuthError, AuthResult};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoggedIn {
    /// The user, with `access_token` set
    pub user: User,
    /// Expiry of the issued token (the JWT `exp`)
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService<S>
where
    S: Store,
{
    store: S,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
}

impl<S> Clone for AuthService<S>
where
    S: Store,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hasher: Arc::clone(&self.hasher),
            issuer: Arc::clone(&self.issuer),
        }
    }
}

impl<S> AuthService<S>
where
    S: Store,
{
    pub fn new(store: S, hasher: Arc<dyn PasswordHasher>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Authenticate and issue an access token
    ///
    /// Unknown email and wrong password produce the same
    /// [`AuthError::InvalidCredentials`], and both pay for one password
    /// verification.
    pub async fn login_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &ClearTextPassword,
    ) -> AuthResult<LoggedIn> {
        let monitor = ctx.monitor();

        let user = match within_deadline(ctx, self.store.users().get_user_by_email(email)).await {
            Ok(user) => user,
            Err(e) => {
                monitor.error(
                    &e,
                    &format!("[auth.login_user] get_user_by_email(email={email})"),
                );
                self.hasher.verify(password, DUMMY_PHC_HASH);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password) {
            monitor.debug("[auth.login_user] password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = match self.issuer.issue(&user) {
            Ok(issued) => issued,
            Err(source) => {
                let err = AuthError::TokenIssue {
                    email: user.email.clone(),
                    source,
                };
                monitor.error(&err, "[auth.login_user] issue access token");
                return Err(err);
            }
        };

        monitor.info("user logged in");

        Ok(LoggedIn {
            user: user.with_access_token(issued.token),
            expires_at: issued.expires_at,
        })
    }

    /// Hash the password and persist a new user
    pub async fn create_user(
        &self,
        ctx: &RequestContext,
        registration: Registration,
    ) -> AuthResult<User> {
        let monitor = ctx.monitor();

        let password_hash = match self.hasher.hash(&registration.password) {
            Ok(hash) => hash,
            Err(e) => {
                let err = AuthError::from(e);
                monitor.error(&err, "[auth.create_user] hash password");
                return Err(err);
            }
        };

        let new_user = NewUser {
            email: registration.email,
            password_hash,
        };

        let user = within_deadline(
            ctx,
            self.store
                .do_in_transaction(move |tx| async move { tx.users().create_user(new_user).await }),
        )
        .await?;

        monitor.info("user created");

        Ok(user)
    }

    pub async fn get_user_by_email(&self, ctx: &RequestContext, email: &str) -> AuthResult<User> {
        within_deadline(ctx, self.store.users().get_user_by_email(email)).await
    }

    /// Identity named by a valid access token
    pub fn verify_token(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.issuer.verify(token)?;
        Ok(claims.identity()?)
    }
}

/// Drop `fut` and fail with [`AuthError::Timeout`] once the context
/// deadline passes
async fn within_deadline<T>(
    ctx: &RequestContext,
    fut: impl Future<Output = AuthResult<T>>,
) -> AuthResult<T> {
    match ctx.deadline() {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AuthError::Timeout)?,
        None => fut.await,
    }
}
