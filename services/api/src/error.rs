//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and the mapping
//! from core errors to HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use pathora_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a core error onto the status code and message returned to the caller.
pub fn port_error_response(error: &PortError) -> (StatusCode, String) {
    let status = match error {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::GenerationFormat(_) | PortError::GenerationProvider(_) => {
            StatusCode::BAD_GATEWAY
        }
        PortError::Configuration(_)
        | PortError::Materialization(_)
        | PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failures_are_bad_gateway() {
        let (status, message) =
            port_error_response(&PortError::GenerationFormat("missing field `title`".to_string()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(message.contains("missing field `title`"));
    }

    #[test]
    fn client_errors_keep_their_status() {
        assert_eq!(
            port_error_response(&PortError::InvalidInput("topic".to_string())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            port_error_response(&PortError::NotFound("Lesson 3".to_string())).0,
            StatusCode::NOT_FOUND
        );
    }
}
