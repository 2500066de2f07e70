//! Pâtisserie Backend
//!
//! REST backend for a pastry blog: recipes, creations, articles and newsletter,
//! with SQLite persistence and images in object storage.

mod api;
mod auth;
mod config;
#[allow(dead_code)]
mod cooking;
mod db;
mod errors;
mod mailer;
mod models;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::SessionKeys;
use config::{Config, LogFormat};
use db::Repository;
use errors::AppError;
use mailer::{EmailClient, Mailer};
use models::ROLE_ADMIN;
use storage::{ObjectStore, StorageClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub storage: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: Arc<SessionKeys>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Pâtisserie Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Storage: {} (bucket {})", config.storage_url, config.storage_bucket);
    tracing::info!("Bind address: {}", config.bind_addr);

    let session_secret = match &config.session_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!(
                "No session secret configured (PATISSERIE_SESSION_SECRET). Sessions will not survive a restart!"
            );
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        }
    };

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    seed_admin(&repo, &config).await?;

    // External services
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let storage = StorageClient::with_timeout(
        &config.storage_url,
        &config.storage_key,
        &config.storage_bucket,
        timeout,
    )?;
    let mailer = EmailClient::with_timeout(
        &config.email_api_url,
        &config.email_api_key,
        &config.email_from,
        timeout,
    )?;

    // Create application state
    let state = AppState {
        repo,
        storage: Arc::new(storage),
        mailer: Arc::new(mailer),
        sessions: Arc::new(SessionKeys::new(&session_secret, config.session_ttl_hours)),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured admin account if it does not exist yet.
pub async fn seed_admin(repo: &Repository, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        tracing::debug!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seeding");
        return Ok(());
    };

    if repo.find_user_by_email(email).await?.is_some() {
        return Ok(());
    }

    let hash = auth::hash_password(password, config.bcrypt_cost)?;
    let user = repo.create_user(email, &hash, ROLE_ADMIN).await?;
    tracing::info!("Created admin user {}", user.email);
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Auth
        .route("/auth/login", post(api::login))
        .route("/auth/session", get(api::session))
        // Recipes
        .route("/recipes", get(api::list_recipes).post(api::create_recipe))
        .route("/recipes/slug/{slug}", get(api::get_recipe_by_slug))
        .route(
            "/recipes/{id}",
            get(api::get_recipe)
                .put(api::update_recipe)
                .delete(api::delete_recipe),
        )
        // Creations
        .route("/creations", get(api::list_creations).post(api::create_creation))
        .route(
            "/creations/{id}",
            get(api::get_creation)
                .put(api::update_creation)
                .delete(api::delete_creation),
        )
        // Articles
        .route("/articles", get(api::list_articles).post(api::create_article))
        .route("/articles/slug/{slug}", get(api::get_article_by_slug))
        .route(
            "/articles/{id}",
            get(api::get_article)
                .put(api::update_article)
                .delete(api::delete_article),
        )
        // Newsletter
        .route("/newsletter", post(api::subscribe))
        // Admin listings
        .route("/admin/recipes", get(api::list_all_recipes))
        .route("/admin/creations", get(api::list_all_creations))
        .route("/admin/articles", get(api::list_all_articles))
        .route("/admin/newsletter", get(api::newsletter_overview))
        .route("/admin/newsletter/send", post(api::send_newsletter))
        .route("/admin/newsletter/{id}", delete(api::delete_subscriber))
        .layer(DefaultBodyLimit::max(body_limit));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
