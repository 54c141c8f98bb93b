//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use kernel::envelope::Envelope;
use monitoring::RequestContext;
use platform::password::ClearTextPassword;
use std::sync::Arc;

use crate::application::AuthService;
use crate::application::config::AuthConfig;
use crate::domain::repository::Store;
use crate::domain::user::Registration;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{LoginRequest, SignupRequest};

/// Shared state for auth handlers
pub struct AuthAppState<S>
where
    S: Store,
{
    pub service: AuthService<S>,
    pub config: Arc<AuthConfig>,
}

impl<S> Clone for AuthAppState<S>
where
    S: Store,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AuthResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/v1/auth/login
pub async fn login<S>(
    State(state): State<AuthAppState<S>>,
    ctx: RequestContext,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse>
where
    S: Store,
{
    let req = json_body(body)?;
    req.validate()?;

    let ctx = ctx.with_timeout(state.config.request_timeout);
    let password = ClearTextPassword::new(req.password);

    let logged_in = state
        .service
        .login_user(&ctx, &req.email, &password)
        .await?;

    let cookie = state.config.cookie.build_set_cookie(
        &logged_in.user.access_token,
        Utc::now(),
        logged_in.expires_at,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(Envelope::data(logged_in.user)),
    ))
}

// ============================================================================
// Signup
// ============================================================================

/// POST /api/v1/auth/signup
pub async fn signup<S>(
    State(state): State<AuthAppState<S>>,
    ctx: RequestContext,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse>
where
    S: Store,
{
    let req = json_body(body)?;
    req.validate()?;

    let ctx = ctx.with_timeout(state.config.request_timeout);
    let registration = Registration {
        email: req.email.trim().to_string(),
        password: ClearTextPassword::new(req.password),
    };

    let user = state.service.create_user(&ctx, registration).await?;

    Ok((StatusCode::CREATED, Json(Envelope::data(user))))
}

// ============================================================================
// Logout (guarded)
// ============================================================================

/// POST /api/v1/auth/logout
///
/// Tokens are stateless, so logging out only clears the cookie.
pub async fn logout<S>(State(state): State<AuthAppState<S>>) -> impl IntoResponse
where
    S: Store,
{
    (
        StatusCode::OK,
        [(header::SET_COOKIE, state.config.cookie.build_delete_cookie())],
        Json(Envelope::ack("logged out")),
    )
}

// ============================================================================
// Current user (guarded)
// ============================================================================

/// GET /api/v1/auth/me
pub async fn me<S>(
    State(state): State<AuthAppState<S>>,
    ctx: RequestContext,
) -> AuthResult<impl IntoResponse>
where
    S: Store,
{
    let email = ctx
        .identity()
        .map(|identity| identity.email.clone())
        .ok_or_else(|| AuthError::Unauthorized("missing identity".to_string()))?;

    let ctx = ctx.with_timeout(state.config.request_timeout);
    let user = state
        .service
        .get_user_by_email(&ctx, &email)
        .await
        .map_err(|e| {
            if e.kind().is_server_error() {
                ctx.monitor().error(&e, "[auth.me] get_user_by_email");
                AuthError::Unauthorized("internal server error".to_string())
            } else {
                AuthError::Unauthorized(e.to_string())
            }
        })?;

    Ok(Json(Envelope::ok_with(user)))
}
