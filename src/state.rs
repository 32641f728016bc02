//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::handlers::ApiHandlers;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub handlers: ApiHandlers,
}

impl AppState {
    pub fn new(config: AppConfig, handlers: ApiHandlers) -> Self {
        Self {
            config: Arc::new(config),
            handlers,
        }
    }
}
