//! Duty Roster Backend
//!
//! A REST backend that stores committed duty schedules in SQLite and predicts
//! upcoming ones from the rotation marker and the deferral queue.

mod api;
mod auth;
mod calendar;
mod config;
mod db;
mod errors;
mod models;
mod roster;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calendar::{Clock, SystemClock, WorkingCalendar};
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub calendar: WorkingCalendar,
    pub clock: Arc<dyn Clock>,
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

    tracing::info!("Starting Duty Roster Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Rest day: {}", config.rest_day);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (ROSTER_API_PSK). Mutations are unauthenticated!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let member_count = repo.list_members().await?.len();
    match repo.get_latest_schedule().await? {
        Some(latest) => tracing::info!(
            "Loaded {} members, latest committed schedule {}",
            member_count,
            latest.date
        ),
        None => tracing::warn!(
            "Loaded {} members, no committed schedule yet; predictions unavailable",
            member_count
        ),
    }

    let state = AppState {
        repo,
        calendar: WorkingCalendar::new(config.rest_day),
        clock: Arc::new(SystemClock),
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
        // Members
        .route("/members", get(api::list_members).post(api::create_member))
        .route("/members/ignore", get(api::list_ignored_members))
        .route("/members/latest/{count}", get(api::latest_members))
        .route(
            "/members/{id}",
            get(api::get_member)
                .patch(api::update_member)
                .delete(api::delete_member),
        )
        .route("/members/{id}/queue", get(api::get_member_queue))
        // Schedules
        .route(
            "/schedules",
            get(api::list_schedules).post(api::create_schedule),
        )
        .route("/schedules/history", get(api::schedule_history))
        .route("/schedules/weekPrediction", get(api::week_prediction))
        .route("/schedules/dayPrediction", get(api::day_prediction))
        .route("/schedules/predict", get(api::predict_schedules))
        .route(
            "/schedules/{date}",
            get(api::get_schedule)
                .put(api::update_schedule)
                .delete(api::delete_schedule),
        )
        // Queue
        .route(
            "/queues",
            get(api::list_pending_queue).post(api::create_queue_entry),
        )
        .route("/queues/all", get(api::list_all_queue))
        .route("/queues/latest", get(api::latest_queue))
        .route(
            "/queues/{id}",
            get(api::get_queue_entry)
                .patch(api::update_queue_entry)
                .delete(api::delete_queue_entry),
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
