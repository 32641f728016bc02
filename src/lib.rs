//! routecheck - an HTTP API kept honest by its OpenAPI document.
//!
//! The API routes are registered through a recording registry so they can
//! be compared with the paths and methods the OpenAPI document declares.
//! Handlers are exercised in tests through a validation harness that checks
//! requests and responses against the same document.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::*;
