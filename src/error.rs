use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures reported by the grid and the store behind it.
#[derive(Error, Debug)]
pub enum GridError {
    /// A referenced trans unit, translation or locale does not exist
    #[error("{0}")]
    NotFound(String),
    /// Unrecognized column or malformed input
    #[error("{0}")]
    InvalidArgument(String),
    /// Request failed the CSRF token check
    #[error("Invalid CSRF token")]
    Forbidden,
    /// Store read or write failed
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
    /// Cached catalogues could not be removed
    #[error("Cache invalidation failed: {0}")]
    Cache(#[from] std::io::Error),
}

pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GridError::NotFound(_) => StatusCode::NOT_FOUND,
            GridError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            GridError::Forbidden => StatusCode::FORBIDDEN,
            GridError::Persistence(_) | GridError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            GridError::Persistence(e) => {
                error!("Store operation failed: {}", e);
                "Internal server error".to_string()
            }
            GridError::Cache(e) => {
                error!("Cache invalidation failed: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
