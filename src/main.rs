//! TurnTracker Backend
//!
//! A REST backend managing shared turn-based options: circular member queues
//! with unanimous-approval gating on every consent-required mutation.

mod api;
mod auth;
mod config;
mod coordinator;
mod db;
mod errors;
mod models;
mod notify;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use coordinator::Coordinator;
use db::Repository;
use notify::Notifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub coordinator: Arc<Coordinator>,
    pub config: Arc<Config>,
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

    tracing::info!("Starting TurnTracker Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (TURN_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Wire the action coordinator
    let coordinator = Arc::new(Coordinator::new(repo.clone(), Notifier::new()));

    // Create application state
    let state = AppState {
        repo,
        coordinator,
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

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Datastore
        .route("/datastore", get(api::get_datastore))
        .route("/datastore/revision", get(api::get_revision))
        // Members
        .route("/members", get(api::list_members))
        .route("/members", post(api::create_member))
        .route("/members/{id}", get(api::get_member))
        .route("/members/{id}", delete(api::delete_member))
        // Options
        .route("/options", get(api::list_options))
        .route("/options", post(api::create_option))
        .route("/options/{id}", get(api::get_option))
        .route("/options/{id}", put(api::rename_option))
        .route("/options/{id}", delete(api::delete_option))
        .route("/options/{id}/current", get(api::get_current_turn))
        .route("/options/{id}/join", post(api::join_option))
        .route("/options/{id}/members", post(api::add_member))
        // Actions
        .route("/options/{id}/actions/complete", post(api::request_complete))
        .route("/options/{id}/actions/leave", post(api::request_leave))
        .route("/options/{id}/actions/remove", post(api::request_remove))
        .route(
            "/options/{id}/actions/delete",
            post(api::request_delete_option),
        )
        .route("/options/{id}/actions/{kind}/vote", post(api::cast_vote))
        .route(
            "/options/{id}/actions/{kind}/cancel",
            post(api::cancel_action),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
