//! Vendpoint CMS Backend
//!
//! The content-management sync layer for the Vendpoint marketing site:
//! authenticated admin endpoints over a content document persisted through
//! the GitHub contents API, with a local-filesystem fallback for
//! development and a local-only override mode.

mod api;
mod auth;
mod config;
mod errors;
mod models;
mod store;
mod validate;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use store::ContentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<ContentStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vendpoint CMS backend");
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!(
        "Content document: {}/{} at {}",
        config.repo_owner,
        config.repo_name,
        config.content_path
    );
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.local_only {
        tracing::info!("Local-only mode enabled; the hosted store will not be contacted");
    } else if config.github_token.is_none() {
        tracing::warn!(
            "No GitHub token configured ({}). Hosted operations will fail or fall back!",
            config::GITHUB_TOKEN_SOURCES.join(" / ")
        );
    }
    if config.session_secret.is_none() {
        tracing::warn!(
            "No session secret configured (SESSION_SECRET / AUTH_SECRET). \
             All admin requests will be rejected!"
        );
    }
    if config.admin_emails.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty. All admin requests will be rejected!");
    }

    let bind_addr = config.bind_addr;

    // Create application state
    let config = Arc::new(config);
    let store = Arc::new(ContentStore::new(config.clone())?);
    let state = AppState { config, store };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone config for the session layer
    let session_config = state.config.clone();

    // Admin sync routes
    let admin_routes = Router::new()
        .route(
            "/content",
            get(api::get_content).put(api::put_content),
        )
        .route("/media", get(api::list_media))
        .route("/upload", post(api::upload_media))
        .route("/github-check", get(api::github_check))
        // Apply session auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::session_layer(session_config.clone(), req, next)
        }))
        // Multipart overhead slack on top of the per-file cap enforced in
        // the upload handler.
        .layer(DefaultBodyLimit::max(store::MAX_UPLOAD_BYTES + 1024 * 1024));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/admin", admin_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
