//! Auth Middleware
//!
//! Guard for protected routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use monitoring::RequestContext;
use platform::cookie::{ACCESS_TOKEN_COOKIE, extract_cookie};

use crate::domain::repository::Store;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

const BEARER: &str = "Bearer ";

/// Middleware that requires a valid access token
///
/// The token comes from the `access_token` cookie or, failing that, an
/// `Authorization: Bearer` header. On success the caller's identity is bound
/// into the request context (and the request monitor is tagged with the
/// user id).
pub async fn require_access_token<S>(
    State(state): State<AuthAppState<S>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    S: Store,
{
    let token = extract_access_token(req.headers())
        .ok_or_else(|| AuthError::Unauthorized("missing access token".to_string()))?;

    let identity = state.service.verify_token(&token)?;

    let mut ctx = req
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_default();
    if ctx.has_monitor() {
        let monitor = ctx.monitor().with_tag("user_id", &identity.id.to_string());
        ctx = ctx.with_monitor(monitor);
    }

    req.extensions_mut()
        .insert(ctx.with_identity(identity.clone()));
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Access token from the cookie, else from a bearer header
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, ACCESS_TOKEN_COOKIE).filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
