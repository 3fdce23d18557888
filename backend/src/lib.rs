//! Weatherboy backend
//!
//! Ingests IMD weather feeds for a set of monitored locations, keeps a raw
//! and normalized history of every fetch, and scores flood / heavy-rain risk
//! from the latest signals.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::LocationRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod ingest;
pub mod repository;
pub mod routes;
pub mod scheduler;
pub mod services;

pub use config::Config;

use repository::Repository;
use services::ScoringEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub scoring: ScoringEngine,
    pub registry: Arc<LocationRegistry>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, registry: LocationRegistry) -> Self {
        Self {
            scoring: ScoringEngine::new(repo.clone()),
            repo,
            registry: Arc::new(registry),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Weatherboy flood-risk API v1"
}
