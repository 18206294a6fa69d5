//! Adapts axum's `HeaderMap` into C5's framework-agnostic
//! `RequestHeaders`, and centralizes the authorize-then-gate call every
//! protected handler needs. Mirrors the transport-adapter split
//! `ic_auth::orchestrator` documents: the orchestrator knows nothing
//! about axum, this module is the only place that does.

use axum::http::HeaderMap;
use ic_auth::{AuthOrchestrator, Principal, RequestHeaders};

use crate::envelope::ApiError;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Runs C5 for one request. `None` means auth is globally disabled and the
/// caller should proceed without a principal.
pub fn authorize(
    orchestrator: &AuthOrchestrator,
    headers: &HeaderMap,
    method: &str,
    path: &str,
    body: &str,
    required_permission: &str,
) -> Result<Option<Principal>, ApiError> {
    let request_headers = RequestHeaders {
        authorization: header_str(headers, "authorization"),
        client_id: header_str(headers, "x-client-id"),
        timestamp: header_str(headers, "x-timestamp"),
        nonce: header_str(headers, "x-nonce"),
        signature: header_str(headers, "x-signature"),
    };

    let now = chrono::Utc::now().timestamp();

    orchestrator
        .authorize(method, path, body, &request_headers, required_permission, now)
        .map_err(ApiError::from)
}
