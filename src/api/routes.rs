//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    add_actor, add_movie, delete_actor, delete_movie, health, list_actors, list_movies,
    metrics_text, ready, update_actor, update_movie, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_text))
        // Actors
        .route("/actors", get(list_actors))
        .route("/actors/add", post(add_actor))
        .route("/actors/update", post(update_actor))
        .route("/actors/delete", post(delete_actor))
        // Movies
        .route("/movies", get(list_movies))
        .route("/movies/add", post(add_movie))
        .route("/movies/update", post(update_movie))
        .route("/movies/delete", post(delete_movie))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
