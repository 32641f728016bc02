//! HTTP server module.
//!
//! Serves the API over plain HTTP with `axum-server` and shuts down
//! gracefully on SIGTERM/SIGINT, giving in-flight requests a grace window.

mod server;
mod shutdown;

pub use server::{serve_with_handle, start_server, ServerError};
pub use shutdown::setup_shutdown_handler;
