//! Auth Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::AuthService;
use crate::application::config::AuthConfig;
use crate::domain::repository::Store;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::require_access_token;

/// Auth routes, meant to be nested under `/api/v1/auth`
///
/// `/logout` and `/me` sit behind the access-token guard.
pub fn auth_router<S>(service: AuthService<S>, config: AuthConfig) -> Router
where
    S: Store,
{
    let state = AuthAppState {
        service,
        config: Arc::new(config),
    };

    let guarded = Router::new()
        .route("/logout", post(handlers::logout::<S>))
        .route("/me", get(handlers::me::<S>))
        .route_layer(from_fn_with_state(
            state.clone(),
            require_access_token::<S>,
        ));

    Router::new()
        .route("/login", post(handlers::login::<S>))
        .route("/signup", post(handlers::signup::<S>))
        .merge(guarded)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{JwtIssuer, TokenIssuer};
    use crate::domain::user::{Registration, User, UserId};
    use crate::infra::memory::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response, StatusCode, header};
    use monitoring::RequestContext;
    use platform::password::{Argon2Hasher, ClearTextPassword};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    const EMAIL: &str = "jane@example.com";
    const PASSWORD: &str = "correct horse";

    async fn app_with_user() -> Router {
        let config = AuthConfig::default();
        let service = AuthService::new(
            MemoryStore::new(),
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            Arc::new(JwtIssuer::new(
                &config.jwt_secret,
                config.access_token_ttl,
            )),
        );
        service
            .create_user(
                &RequestContext::new(),
                Registration {
                    email: EMAIL.to_string(),
                    password: ClearTextPassword::new(PASSWORD),
                },
            )
            .await
            .unwrap();

        Router::new().nest("/api/v1/auth", auth_router(service, config))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_of(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router) -> Response<Body> {
        app.clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": EMAIL, "password": PASSWORD}),
            ))
            .await
            .unwrap()
    }

    fn token_from(issuer: &JwtIssuer) -> String {
        let user = User {
            id: Some(UserId::new()),
            email: EMAIL.to_string(),
            password: String::new(),
            created_at: None,
            updated_at: None,
            access_token: String::new(),
        };
        issuer.issue(&user).unwrap().token
    }

    fn access_token_of(response: &Response<Body>) -> String {
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie
            .strip_prefix("access_token=")
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_returns_user() {
        let app = app_with_user().await;
        let response = login(&app).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("access_token=ey"));
        for attr in ["Path=/", "Expires=", "HttpOnly", "Secure", "SameSite=None"] {
            assert!(cookie.contains(attr), "missing {attr} in {cookie}");
        }

        let token = access_token_of(&response);
        let body = json_of(response).await;
        assert_eq!(body["data"]["email"], EMAIL);
        assert_eq!(body["data"]["access_token"], token.as_str());
        assert!(body["data"].get("password").is_none());
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_login_cookie_expires_with_token() {
        let app = app_with_user().await;
        let response = login(&app).await;

        let claims = JwtIssuer::new(&AuthConfig::default().jwt_secret, Duration::from_secs(60))
            .verify(&access_token_of(&response))
            .unwrap();
        let expires = chrono::DateTime::from_timestamp(claims.exp, 0)
            .unwrap()
            .format("Expires=%a, %d %b %Y %H:%M:%S GMT;")
            .to_string();

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains(&expires), "{expires} not in {cookie}");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = app_with_user().await;
        let response = app
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": EMAIL, "password": "wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(
            json_of(response).await,
            json!({"error": "invalid email or password"})
        );
    }

    #[tokio::test]
    async fn test_login_unknown_email_same_response() {
        let app = app_with_user().await;
        let response = app
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": "nobody@example.com", "password": PASSWORD}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_of(response).await,
            json!({"error": "invalid email or password"})
        );
    }

    #[tokio::test]
    async fn test_login_missing_field() {
        let app = app_with_user().await;
        let response = app
            .oneshot(post_json("/api/v1/auth/login", json!({"email": EMAIL})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await,
            json!({"error": "password is required"})
        );
    }

    #[tokio::test]
    async fn test_login_malformed_body() {
        let app = app_with_user().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_of(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_me_with_cookie() {
        let app = app_with_user().await;
        let token = access_token_of(&login(&app).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::COOKIE, format!("access_token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["data"]["email"], EMAIL);
        assert!(body["data"].get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_me_with_bearer() {
        let app = app_with_user().await;
        let token = access_token_of(&login(&app).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_me_without_token() {
        let app = app_with_user().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_of(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_me_masks_store_failure() {
        let config = AuthConfig::default();
        let issuer = JwtIssuer::new(&config.jwt_secret, config.access_token_ttl);
        let token = token_from(&issuer);
        let service = AuthService::new(
            MemoryStore::unavailable(),
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            Arc::new(issuer),
        );
        let app = Router::new().nest("/api/v1/auth", auth_router(service, config));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_of(response).await,
            json!({"error": "internal server error"})
        );
    }

    #[tokio::test]
    async fn test_me_with_forged_token() {
        let app = app_with_user().await;
        let token = token_from(&JwtIssuer::new(
            b"not the secret",
            std::time::Duration::from_secs(60),
        ));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::COOKIE, format!("access_token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = app_with_user().await;
        let token = access_token_of(&login(&app).await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/logout")
                    .header(header::COOKIE, format!("access_token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "access_token=; Path=/; Max-Age=0; HttpOnly"
        );
        assert_eq!(
            json_of(response).await,
            json!({"status": "ok", "message": "logged out"})
        );
    }

    #[tokio::test]
    async fn test_logout_requires_token() {
        let app = app_with_user().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_then_duplicate() {
        let app = app_with_user().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/signup",
                json!({"email": "new@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_of(response).await;
        assert_eq!(body["data"]["email"], "new@example.com");
        assert!(body["data"]["id"].is_string());

        let response = app
            .oneshot(post_json(
                "/api/v1/auth/signup",
                json!({"email": "NEW@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_of(response).await,
            json!({"error": "email already registered"})
        );
    }
}
