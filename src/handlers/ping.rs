use async_trait::async_trait;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::PingHandler;
use crate::error::ApiError;

/// The only record the default handler knows about.
pub const RECORD_ID: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
struct Pong {
    ping: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPingHandler;

impl DefaultPingHandler {
    fn lookup(raw_id: &str) -> Result<Record, ApiError> {
        let id = raw_id
            .parse::<i64>()
            .ok()
            .filter(|id| *id >= 1)
            .ok_or(ApiError::InvalidId)?;

        if id == RECORD_ID {
            Ok(Record { id })
        } else {
            Err(ApiError::NotFound)
        }
    }
}

#[async_trait]
impl PingHandler for DefaultPingHandler {
    async fn ping(&self) -> Response {
        Json(Pong { ping: "pong" }).into_response()
    }

    async fn get_record(&self, raw_id: &str) -> Response {
        match Self::lookup(raw_id) {
            Ok(record) => Json(record).into_response(),
            Err(e) => {
                tracing::debug!(raw_id, error = %e, "Record lookup failed");
                e.into_response()
            }
        }
    }
}
