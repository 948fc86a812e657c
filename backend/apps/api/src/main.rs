//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use std::sync::Arc;

use auth::{PgAuthRepository, RedisSessionStore, admin_users_router_generic, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use marketplace::{PgMarketplaceRepository, marketplace_router};
use payments::payments_router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,auth=info,marketplace=info,payments=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Session store
    let redis = auth::infra::redis::connect(&config.redis_url).await?;
    let sessions = RedisSessionStore::new(redis, config.auth.max_indexed_sessions);

    tracing::info!("Connected to Redis");

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
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
        .allow_credentials(true);

    // Build router
    let auth_config = Arc::new(config.auth.clone());
    let auth_repo = PgAuthRepository::new(pool.clone());
    let marketplace_repo = PgMarketplaceRepository::new(pool.clone());

    let app = Router::new()
        .nest(
            "/api/auth",
            auth_router(auth_repo.clone(), sessions.clone(), config.auth.clone()),
        )
        .nest(
            "/api/admin/users",
            admin_users_router_generic(
                Arc::new(auth_repo),
                Arc::new(sessions.clone()),
                auth_config.clone(),
            ),
        )
        .merge(marketplace_router(
            marketplace_repo.clone(),
            sessions.clone(),
            auth_config.clone(),
            config.marketplace.clone(),
        ))
        .merge(payments_router(
            marketplace_repo,
            sessions,
            auth_config,
            config.payments.clone(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
