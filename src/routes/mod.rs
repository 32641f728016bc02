//! HTTP routes of the API.
//!
//! Routes are registered through a [`RouteRegistry`] so the set of served
//! paths and methods can be compared against the OpenAPI document. Every
//! response carries `Cache-Control: no-store`.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod api;
mod registry;

pub use registry::{RegisteredRoute, RouteRegistry};

use axum::{middleware, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{ApiVariant, CACHE_CONTROL_API};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Prefix every API route is nested under
pub const API_PREFIX: &str = "/api";

/// Routes served for `variant`, with their recorded paths.
pub fn api_routes(variant: ApiVariant) -> RouteRegistry<AppState> {
    let routes = match variant {
        ApiVariant::Records => RouteRegistry::new()
            .get("/ping", api::ping)
            .get("/get-record/{id}", api::get_record),
        ApiVariant::Errors => RouteRegistry::new()
            .get("/ping", api::ping)
            .get("/not-found", api::not_found)
            .post("/internal-server-error", api::internal_server_error),
    };
    RouteRegistry::new().nest(API_PREFIX, routes)
}

/// Creates the Axum router for the configured variant.
pub fn create_router(state: AppState) -> Router {
    api_routes(state.config.api.variant)
        .into_router()
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_API),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
