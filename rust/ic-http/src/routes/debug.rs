//! `/v1/debug/connections`: connection-stats endpoint, only mounted when
//! `IC_DEBUG_ENDPOINT` is set (§6: "`GODEBUG` (or equivalent sentinel)
//! enables a debug endpoint exposing connection stats").

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::auth_mw::authorize;
use crate::envelope::ResponseEnvelope;
use crate::state::SharedState;

/// Name of the sentinel env var gating this route's registration.
pub const DEBUG_ENDPOINT_ENV: &str = "IC_DEBUG_ENDPOINT";

pub fn enabled() -> bool {
    std::env::var(DEBUG_ENDPOINT_ENV).is_ok()
}

pub async fn connections(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let request_id = Uuid::new_v4().to_string();
    if let Err(e) = authorize(
        &state.auth,
        &headers,
        "GET",
        "/v1/debug/connections",
        "",
        "read:debug",
    ) {
        return e.into_response_with_request_id(&request_id);
    }

    let redis_alive = state.redis.ping().await.is_ok();
    let body = ResponseEnvelope::ok(
        serde_json::json!({ "redis_connected": redis_alive }),
        request_id,
    );
    (axum::http::StatusCode::OK, Json(body)).into_response()
}
