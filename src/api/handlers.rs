//! HTTP API handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

use crate::catalog::{Actor, Catalog, Movie, MovieQuery};
use crate::error::ApiError;
use crate::metrics;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend.
    pub catalog: Arc<dyn Catalog>,
    /// Prometheus scrape handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state around a catalog.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the store answered.
    pub ready: bool,
}

/// `?id=` parameter of the delete endpoints.
#[derive(Debug, Deserialize)]
pub struct IdParam {
    /// Raw id value.
    pub id: Option<String>,
}

/// Query parameters of `GET /movies`.
#[derive(Debug, Default, Deserialize)]
pub struct MovieListParams {
    /// Column to sort by.
    pub sort_field: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
    /// Movie title substring.
    pub movie: Option<String>,
    /// Actor name substring.
    pub actor: Option<String>,
}

fn require_name(name: &str, what: &'static str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Missing(what));
    }
    Ok(())
}

fn require_id(id: i32, what: &'static str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::Missing(what));
    }
    Ok(id)
}

fn parse_id_param(
    query: Result<Query<IdParam>, QueryRejection>,
    what: &'static str,
) -> Result<i32, ApiError> {
    let Query(param) = query?;
    let raw = param
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::Missing(what))?;
    raw.parse::<i32>()
        .map_err(|_| ApiError::InvalidQuery(format!("Invalid {what}: {raw}")))
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if the store answers, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.catalog.ping().await.is_ok();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready }))
}

/// Prometheus scrape endpoint.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// `GET /actors`
pub async fn list_actors(State(state): State<AppState>) -> Result<Json<Vec<Actor>>, ApiError> {
    let _timer = metrics::timer_request("list_actors");
    Ok(Json(state.catalog.list_actors().await?))
}

/// `POST /actors/add`
pub async fn add_actor(
    State(state): State<AppState>,
    payload: Result<Json<Actor>, JsonRejection>,
) -> Result<(StatusCode, Json<Actor>), ApiError> {
    let _timer = metrics::timer_request("add_actor");
    let Json(actor) = payload?;
    require_name(&actor.name, "actor name")?;

    let created = state.catalog.create_actor(&actor).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /actors/update`
pub async fn update_actor(
    State(state): State<AppState>,
    payload: Result<Json<Actor>, JsonRejection>,
) -> Result<Json<Actor>, ApiError> {
    let _timer = metrics::timer_request("update_actor");
    let Json(actor) = payload?;
    require_id(actor.id, "actor ID")?;

    Ok(Json(state.catalog.update_actor(&actor).await?))
}

/// `POST /actors/delete?id=N`
pub async fn delete_actor(
    State(state): State<AppState>,
    query: Result<Query<IdParam>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let _timer = metrics::timer_request("delete_actor");
    let id = parse_id_param(query, "actor ID")?;

    state.catalog.delete_actor(id).await?;
    Ok(StatusCode::OK)
}

/// `GET /movies?sort_field=&sort_order=&movie=&actor=`
pub async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<MovieListParams>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let _timer = metrics::timer_request("list_movies");
    let Query(params) = query?;
    let movie_query = MovieQuery::parse(
        params.sort_field.as_deref(),
        params.sort_order.as_deref(),
        params.movie.as_deref(),
        params.actor.as_deref(),
    )?;

    Ok(Json(state.catalog.list_movies(&movie_query).await?))
}

/// `POST /movies/add`
pub async fn add_movie(
    State(state): State<AppState>,
    payload: Result<Json<Movie>, JsonRejection>,
) -> Result<(StatusCode, Json<Movie>), ApiError> {
    let _timer = metrics::timer_request("add_movie");
    let Json(movie) = payload?;
    require_name(&movie.name, "movie name")?;

    let created = state.catalog.create_movie(&movie).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /movies/update`
pub async fn update_movie(
    State(state): State<AppState>,
    payload: Result<Json<Movie>, JsonRejection>,
) -> Result<Json<Movie>, ApiError> {
    let _timer = metrics::timer_request("update_movie");
    let Json(movie) = payload?;
    require_id(movie.id, "movie ID")?;

    Ok(Json(state.catalog.update_movie(&movie).await?))
}

/// `POST /movies/delete?id=N`
pub async fn delete_movie(
    State(state): State<AppState>,
    query: Result<Query<IdParam>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let _timer = metrics::timer_request("delete_movie");
    let id = parse_id_param(query, "movie ID")?;

    state.catalog.delete_movie(id).await?;
    Ok(StatusCode::OK)
}
