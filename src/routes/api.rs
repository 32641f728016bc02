//! Route functions for the `/api` endpoints.
//!
//! Each function extracts what the request carries and delegates to the
//! handler set in [`AppState`].

use axum::{
    extract::{Path, State},
    response::Response,
};

use crate::state::AppState;

pub async fn ping(State(state): State<AppState>) -> Response {
    state.handlers.ping.ping().await
}

/// The id is taken as a raw string; the handler decides what is valid.
pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.handlers.ping.get_record(&id).await
}

pub async fn not_found(State(state): State<AppState>) -> Response {
    state.handlers.errors.not_found().await
}

pub async fn internal_server_error(State(state): State<AppState>) -> Response {
    state.handlers.errors.internal_server_error().await
}
