//! Business logic behind the API endpoints.
//!
//! Handlers sit behind traits so an alternative implementation can be
//! composed into [`ApiHandlers`] at startup. The axum route functions in
//! [`crate::routes`] only extract request data and delegate here.

mod errors;
mod ping;

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

pub use errors::DefaultErrorHandler;
pub use ping::{DefaultPingHandler, Record, RECORD_ID};

/// Liveness and record lookup endpoints.
#[async_trait]
pub trait PingHandler: Send + Sync {
    async fn ping(&self) -> Response;

    /// `raw_id` is the unparsed path segment.
    async fn get_record(&self, raw_id: &str) -> Response;
}

/// Endpoints that always fail, used to exercise documented error responses.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn not_found(&self) -> Response;

    async fn internal_server_error(&self) -> Response;
}

/// The handler set a router is built with.
#[derive(Clone)]
pub struct ApiHandlers {
    pub ping: Arc<dyn PingHandler>,
    pub errors: Arc<dyn ErrorHandler>,
}

impl ApiHandlers {
    pub fn new(ping: Arc<dyn PingHandler>, errors: Arc<dyn ErrorHandler>) -> Self {
        Self { ping, errors }
    }
}

impl Default for ApiHandlers {
    fn default() -> Self {
        Self::new(Arc::new(DefaultPingHandler), Arc::new(DefaultErrorHandler))
    }
}
