//! Image Tagging Service - Backend Server
//!
//! Stores image metadata, optionally with the raw bytes or source url, and
//! tags images through an external recognition provider on request.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod routes;
mod services;
mod store;

pub use config::Config;

use external::{ImageTagger, ImaggaClient};
use store::{ImageStore, MemoryImageStore, PgImageStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub tagger: Arc<dyn ImageTagger>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "image_tagging_server=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Image Tagging Server");
    tracing::info!("Environment: {}", config.environment);

    let store = connect_store(&config).await?;
    let tagger = ImaggaClient::new(&config.imagga)?;
    tracing::info!("Tagging provider: {}", config.imagga.tags_endpoint);

    // Create application state
    let state = AppState {
        store,
        tagger: Arc::new(tagger),
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// PostgreSQL when a database url is configured, memory otherwise
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ImageStore>> {
    let Some(url) = config.database.url.as_deref() else {
        tracing::warn!("No database url configured, images are kept in memory only");
        return Ok(Arc::new(MemoryImageStore::new()));
    };

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    Ok(Arc::new(PgImageStore::new(db_pool)))
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .merge(routes::api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Image Tagging Service API v1.0"
}
