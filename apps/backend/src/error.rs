//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mastery_core::EngineError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Ledger retries exhausted; nothing from the session was applied.
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Serialization failure or deadlock reported by PostgreSQL.
    pub fn is_serialization_conflict(&self) -> bool {
        match self {
            ApiError::Database(sqlx::Error::Database(db_error)) => matches!(
                db_error.code().as_deref(),
                Some("40001") | Some("40P01")
            ),
            _ => false,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "transient_failure"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
            ApiError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "engine_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let error = ApiError::NotFound("learner 123".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_status() {
        let error = ApiError::BadRequest("invalid input".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transient_status() {
        let error = ApiError::Transient("ledger retries exhausted".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_engine_error_status() {
        let error = ApiError::from(EngineError::NoEligibleAdvice {
            biome_id: "math".to_string(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_status() {
        let error = ApiError::Internal("unexpected error".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_migration_error_status() {
        let error = ApiError::Migration("migration failed".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display_not_found() {
        let error = ApiError::NotFound("Learner 123".to_string());
        assert_eq!(error.to_string(), "Not found: Learner 123");
    }

    #[test]
    fn test_error_display_engine() {
        let error = ApiError::from(EngineError::NoEligibleAdvice {
            biome_id: "fr".to_string(),
        });
        assert_eq!(error.to_string(), "Engine error: no eligible advice for biome fr");
    }

    #[test]
    fn test_error_display_transient() {
        let error = ApiError::Transient("gave up after 5 attempts".to_string());
        assert_eq!(error.to_string(), "Transient failure: gave up after 5 attempts");
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert!(!ApiError::Internal("x".to_string()).is_serialization_conflict());
        assert!(!ApiError::Database(sqlx::Error::RowNotFound).is_serialization_conflict());
    }
}
