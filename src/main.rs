//! Feature Banner Service
//!
//! A REST backend that serves feature banners by tag and feature, with
//! password login, signed session tokens and role-based access control.

mod api;
mod auth;
mod banner;
mod config;
mod db;
mod errors;
mod models;
mod service;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{PasswordAuthenticator, TokenIssuer};
use config::{Config, LogFormat};
use db::Repository;
use service::{AuthService, BannerService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub banners: Arc<BannerService>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    tracing::info!("Starting Feature Banner Service");
    tracing::info!("Configuration: {:?}", config);
    if config.previous_signing_key.is_some() {
        tracing::info!("Previous signing key configured; old tokens remain valid until expiry");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let tokens = Arc::new(TokenIssuer::from_config(&config));
    let state = AppState {
        auth: Arc::new(AuthService::new(
            repo.clone(),
            tokens,
            PasswordAuthenticator::new(),
        )),
        banners: Arc::new(BannerService::new(repo.clone())),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Token verifier for the auth layer
    let tokens = state.auth.tokens();

    // Routes behind the bearer token
    let session_routes = Router::new()
        .route("/user_banner", get(api::user_banner))
        .route("/banner", get(api::list_banners).post(api::create_banner))
        .route(
            "/banner/{id}",
            patch(api::update_banner).delete(api::delete_banner),
        )
        .route_layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(tokens.clone(), req, next)
        }));

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(api::register))
        .route("/login", post(api::login));

    Router::new()
        .merge(session_routes)
        .merge(public_routes)
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

/// Resolve on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests;
