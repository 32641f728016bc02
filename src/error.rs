use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;
use crate::http::ServerError;
use crate::openapi::{ConsistencyReport, SpecError};

/// Error body returned by the API for business-level failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub error_msg: String,
}

/// Business errors. These are ordinary responses with an error-shaped body,
/// not failures of the server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Id must be integer greater than 0.")]
    InvalidId,

    #[error("Entity not found.")]
    NotFound,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code, `None` for errors rendered without a body.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::InvalidId => Some("err_invalid_id"),
            ApiError::NotFound => Some("err_not_found"),
            ApiError::Internal => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.code() {
            Some(error_code) => {
                let body = ErrorBody {
                    error_code,
                    error_msg: self.to_string(),
                };
                (status, Json(body)).into_response()
            }
            None => {
                tracing::error!(status = status.as_u16(), "Internal error");
                status.into_response()
            }
        }
    }
}

/// Errors that abort the process before or while serving.
///
/// `main` maps every variant to a non-zero exit code; request-level errors
/// never end up here.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Could not load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Route discrepancies found:\n{0}")]
    RouteDiscrepancies(ConsistencyReport),
}

impl StartupError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::RouteDiscrepancies(_) => 2,
            _ => 1,
        }
    }
}
