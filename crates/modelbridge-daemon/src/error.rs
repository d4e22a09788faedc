//! Error types for modelbridged

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use modelbridge_types::protocol::ErrorBody;
use modelbridge_types::{EvaluationError, FailureKind};
use thiserror::Error;

/// Daemon-level errors; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors, rendered in the UM-Bridge error envelope
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request names a model this server does not serve
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// Operation the model does not implement
    #[error("{0}")]
    UnsupportedFeature(String),

    /// Request body could not be decoded
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Evaluation failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl ApiError {
    /// HTTP status and UM-Bridge error type
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::ModelNotFound(_) => (StatusCode::BAD_REQUEST, "ModelNotFound"),
            ApiError::UnsupportedFeature(_) => (StatusCode::BAD_REQUEST, "UnsupportedFeature"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "InvalidInput"),
            ApiError::Evaluation(err) => match err.kind() {
                FailureKind::ShapeMismatch | FailureKind::InvalidConfiguration => {
                    (StatusCode::BAD_REQUEST, "InvalidInput")
                }
                FailureKind::MalformedOutput => (StatusCode::INTERNAL_SERVER_ERROR, "InvalidOutput"),
                FailureKind::Io
                | FailureKind::SolverLaunch
                | FailureKind::SolverFailed
                | FailureKind::Timeout => (StatusCode::INTERNAL_SERVER_ERROR, "SolverError"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        (status, Json(ErrorBody::new(kind, self.to_string()))).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
