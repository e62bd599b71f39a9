use crate::whisperwall::auth::{google::GoogleOAuth, AuthConfig, AuthState};
use crate::whisperwall::views::Views;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod auth;
pub mod handlers;
pub mod storage;
pub mod views;

pub const GIT_COMMIT_HASH: &str = env!("WHISPERWALL_BUILD_SHA");

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Build the application router.
///
/// Split out of [`new`] so tests can drive the full HTTP surface without
/// binding a listener.
pub fn router(
    pool: PgPool,
    auth_state: Arc<AuthState>,
    views: Arc<Views>,
    assets_dir: &Path,
) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route("/secrets", get(handlers::secrets))
        .route(
            "/submit",
            get(handlers::submit_form).post(handlers::submit),
        )
        .route("/logout", get(handlers::logout))
        .route("/auth/google", get(handlers::google_redirect))
        .route("/auth/google/secrets", get(handlers::google_callback))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(views))
                .layer(Extension(pool)),
        )
        .fallback_service(ServeDir::new(assets_dir))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    config: AuthConfig,
    google: GoogleOAuth,
    assets_dir: PathBuf,
) -> Result<()> {
    // Connect to database, fail fast if unavailable
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let views = Arc::new(Views::new().context("Failed to load templates")?);
    let auth_state = Arc::new(AuthState::new(config, google));

    let app = router(pool.clone(), auth_state, views, &assets_dir);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    pool.close().await;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
