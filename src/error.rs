//! Unified error types for the catalog service.

use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Top-level error for startup and CLI commands.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not build the connection pool.
    #[error("failed to create connection pool: {0}")]
    PoolBuild(String),

    /// Could not check out a connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Statement failed (constraint violation, connection loss, ...).
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Operation exceeded the configured deadline.
    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Update or delete addressed a row that does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind ("actor", "movie").
        entity: &'static str,
        /// Requested id.
        id: i32,
    },

    /// Store refused the operation (in-memory store switched offline).
    #[error("store unavailable")]
    Unavailable,

    /// Constraint violation reported by a non-Postgres store.
    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Movie list query errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Sort field is not on the allow-list.
    #[error("Not correct sort field: {0}")]
    InvalidSortField(String),

    /// Sort order is neither asc nor desc.
    #[error("Not correct sort order: {0}")]
    InvalidSortOrder(String),
}

/// Errors returned by HTTP handlers.
///
/// Rendered as a plain-text body with the matching status code.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body is not valid JSON for the entity.
    #[error("{0}")]
    InvalidBody(String),

    /// Query string could not be decoded.
    #[error("{0}")]
    InvalidQuery(String),

    /// Required parameter or field is absent.
    #[error("No {0}")]
    Missing(&'static str),

    /// Sort or filter value rejected.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_)
            | ApiError::InvalidQuery(_)
            | ApiError::Missing(_)
            | ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        crate::metrics::inc_request_errors(status);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
