//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but request-level
//! errors should use `auth::AuthError` / `kernel::error::AppError`.

use std::net::SocketAddr;
use std::sync::Arc;

use auth::{AuthConfig, AuthService, JwtIssuer, PgStore, Store, auth_router};
use axum::{
    Router,
    http::{HeaderValue, Method, header, request::Parts},
    middleware::from_fn_with_state,
    routing::get,
};
use monitoring::middleware::attach_monitor;
use monitoring::{DEFAULT_FLUSH_WAIT, SharedMonitor, StructuredMonitor};
use platform::config::Config;
use platform::cors::OriginPolicy;
use platform::password::Argon2Hasher;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::global();

    init_tracing(config);
    for warning in config.load_warnings() {
        tracing::warn!(warning = %warning, "Config source skipped");
    }

    let monitor: SharedMonitor = Arc::new(StructuredMonitor::new(config, !config.is_production())?);

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url())
        .await?;

    tracing::info!(host = %config.db_host, db = %config.db_name, "Connected to database");

    let service = AuthService::new(
        PgStore::new(pool),
        Arc::new(Argon2Hasher::default()),
        Arc::new(JwtIssuer::new(&config.jwt_secret, config.access_token_ttl)),
    );

    let app = build_router(config, service, Arc::clone(&monitor));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(service = %config.service_name, env = %config.env, "Listening on {}", addr);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            monitor.flush(DEFAULT_FLUSH_WAIT).await;
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Server shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            timeout = ?config.shutdown_timeout(),
            "Open connections did not drain in time"
        ),
    }

    monitor.flush(DEFAULT_FLUSH_WAIT).await;

    Ok(())
}

/// JSON lines to stdout; `debug` outside production unless `RUST_LOG` says otherwise
fn init_tracing(config: &Config) {
    let default_filter = if config.is_production() {
        "info"
    } else {
        "debug"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Full application router
///
/// `/healthz` is merged after the CORS layer so origin checks never apply
/// to it.
fn build_router<S>(config: &Config, service: AuthService<S>, monitor: SharedMonitor) -> Router
where
    S: Store,
{
    let api = Router::new()
        .nest(
            "/api/v1/auth",
            auth_router(service, AuthConfig::from_config(config)),
        )
        .layer(cors_layer(config));

    Router::new()
        .merge(api)
        .route("/healthz", get(healthz))
        .layer(from_fn_with_state(monitor, attach_monitor))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let policy = OriginPolicy::new(config.cors_origins());

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, parts: &Parts| policy.allows_request(origin, parts),
        ))
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}

/// GET /healthz
async fn healthz() -> &'static str {
    "OK"
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, starting graceful shutdown"),
        _ = terminate => tracing::info!("SIGTERM received, starting graceful shutdown"),
    }
}
