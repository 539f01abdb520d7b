//! Status page.
//!
//! Plain HTTP requests on the listener port (anything that is not a
//! WebSocket upgrade) end up here:
//!
//! - `GET /status` returns `{"version": "...", "connections": N}`;
//! - every other request target gets `403 Permission Denied`.
//!
//! The target is compared exactly, query string included, so `/status?x`
//! and `/status/` are forbidden too.

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Request target answered with the JSON status report.
pub const STATUS_PATH: &str = "/status";

/// The JSON body of the status page.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub connections: usize,
}

/// Whether `uri` asks for the status report.
pub fn is_status_request(uri: &Uri) -> bool {
    uri.path_and_query()
        .map_or(uri.path(), |pq| pq.as_str())
        == STATUS_PATH
}

/// Builds the response to a plain (non-upgrade) request for `uri`.
pub fn respond(uri: &Uri, connections: usize) -> Response {
    if !is_status_request(uri) {
        return (StatusCode::FORBIDDEN, "403 Permission Denied\n").into_response();
    }

    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        connections,
    })
    .into_response()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
