//! Orgtrack Backend
//!
//! A REST backend for tracking a field sales organization: a reporting
//! hierarchy of members, teams with pockets, logged activities, weekly
//! targets and notifications, all guarded by role-based access resolution.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod hierarchy;
mod membership;
mod models;
mod notify;
mod permissions;

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
use db::Repository;
use permissions::PolicyTable;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub policy: Arc<PolicyTable>,
    pub config: Arc<Config>,
    /// Serializes structural hierarchy mutations (register, reparent,
    /// delete). The snapshot a mutation validates against must still be
    /// current when its precomputed rows land, so the whole
    /// snapshot-validate-apply sequence runs under this lock.
    pub org_lock: Arc<tokio::sync::Mutex<()>>,
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

    tracing::info!("Starting Orgtrack Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (ORGTRACK_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Load the access policy: file override or built-in default
    let policy = match &config.policy_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            tracing::info!("Loaded access policy from {:?}", path);
            PolicyTable::from_json(&raw)?
        }
        None => PolicyTable::default(),
    };

    // Create application state
    let state = AppState {
        repo,
        policy: Arc::new(policy),
        config: Arc::new(config.clone()),
        org_lock: Arc::new(tokio::sync::Mutex::new(())),
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
        // Members and hierarchy
        .route("/members", get(api::list_members))
        .route("/members", post(api::register_member))
        .route("/members/{id}", get(api::get_member))
        .route("/members/{id}", put(api::update_member))
        .route("/members/{id}", delete(api::delete_member))
        .route("/members/{id}/parent", put(api::reparent_member))
        .route("/members/{id}/subtree", get(api::member_subtree))
        .route("/members/{id}/ancestors", get(api::member_ancestors))
        .route("/members/{id}/activities", get(api::member_activities))
        // Teams
        .route("/teams", get(api::list_teams))
        .route("/teams", post(api::create_team))
        .route("/teams/move-member", post(api::move_team_member))
        .route("/teams/{id}", get(api::get_team))
        .route("/teams/{id}", put(api::update_team))
        .route("/teams/{id}", delete(api::delete_team))
        .route("/teams/{id}/members", post(api::add_team_member))
        .route("/teams/{id}/members", delete(api::remove_team_member))
        .route("/teams/{id}/pockets", get(api::list_pockets))
        // Pockets
        .route("/pockets", post(api::create_pocket))
        .route("/pockets/move-member", post(api::move_pocket_member))
        .route("/pockets/{id}", get(api::get_pocket))
        .route("/pockets/{id}", put(api::update_pocket))
        .route("/pockets/{id}", delete(api::delete_pocket))
        .route("/pockets/{id}/members", post(api::add_pocket_member))
        .route("/pockets/{id}/members", delete(api::remove_pocket_member))
        .route("/pockets/{id}/lead", post(api::set_pocket_lead))
        // Activities and targets
        .route("/activities", get(api::list_activities))
        .route("/activities", post(api::create_activity))
        .route("/activities/{id}", delete(api::delete_activity))
        .route("/targets", post(api::set_target))
        .route("/targets/{memberId}", get(api::member_targets))
        // Notifications
        .route("/notifications", get(api::list_notifications))
        .route("/notifications/unread-count", get(api::unread_count))
        .route("/notifications/read-all", post(api::mark_all_read))
        .route("/notifications/{id}/read", post(api::mark_read))
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

#[cfg(test)]
mod tests;
