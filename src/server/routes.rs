use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        .route("/api/tiers", get(handlers::tiers))
        .route("/api/matches", get(handlers::matches))
        .route("/api/matches/summary", get(handlers::matches_summary))
        .route("/api/matches/by-tier/:tier", get(handlers::matches_by_tier))
        .route("/collect", post(handlers::collect))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
