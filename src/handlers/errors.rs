use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use super::ErrorHandler;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn not_found(&self) -> Response {
        ApiError::NotFound.into_response()
    }

    async fn internal_server_error(&self) -> Response {
        ApiError::Internal.into_response()
    }
}
