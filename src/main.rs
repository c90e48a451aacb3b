use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use rusqlite::params;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tembea::auth;
use tembea::cache::ListingCache;
use tembea::config::{Cli, Config};
use tembea::db;
use tembea::media::MediaStore;
use tembea::routes;
use tembea::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure the bucket root exists
    std::fs::create_dir_all(config.buckets_path())?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    let media = MediaStore::new(
        config.buckets_path().clone(),
        config.public_base_url().to_string(),
        config.storage.max_upload_bytes,
    );
    let listings = ListingCache::new(Duration::from_secs(config.cache.listing_ttl_secs));

    let state = AppState {
        db: pool,
        config: config.clone(),
        media: Arc::new(media),
        listings,
    };

    // Build router
    let mut app = Router::new()
        .route("/media/{bucket}/{*path}", get(routes::media::serve))
        .merge(routes::auth::router())
        .merge(routes::destinations::router())
        .merge(routes::packages::router())
        .merge(routes::testimonials::router())
        .merge(routes::images::router());

    // Test-only seed endpoint: creates an admin user + session, returns the
    // session cookie
    if std::env::var("TEMBEA_TEST_SEED").is_ok() {
        app = app.route("/test/seed", get(test_seed));
    }

    // axum's default body limit is below the upload cap; the store enforces
    // the authoritative per-file limit
    let body_limit = config.storage.max_upload_bytes as usize + 1024 * 1024;
    let app = app
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Test-only: seed an admin user + session and return the session cookie.
/// Only mounted when TEMBEA_TEST_SEED env var is set.
async fn test_seed(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.get().unwrap();
    let user_id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT OR IGNORE INTO users (id, email, password_hash, is_admin) \
         VALUES (?1, 'admin@test.local', '', 1)",
        params![user_id],
    )
    .unwrap();

    // Get the actual user id (may already exist from previous seed call)
    let uid: String = conn
        .query_row(
            "SELECT id FROM users WHERE email = 'admin@test.local'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    drop(conn);

    let token =
        auth::session::create_session(&state.db, &uid, state.config.auth.session_hours).unwrap();

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        format!("{{\"user_id\":\"{}\",\"email\":\"admin@test.local\"}}", uid),
    )
}
