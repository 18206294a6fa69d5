//! `/v1/health/live`, `/v1/health/ready`, `/v1/health` (§6). Liveness and
//! readiness are public; the detailed breakdown requires auth like every
//! other non-public endpoint.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::auth_mw::authorize;
use crate::envelope::ResponseEnvelope;
use crate::health::ComponentStatus;
use crate::state::SharedState;

pub async fn live(State(state): State<SharedState>) -> Response {
    let (status, uptime) = state.health.liveness();
    let request_id = Uuid::new_v4().to_string();
    let body = ResponseEnvelope::ok(
        serde_json::json!({
            "status": status,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_secs": uptime.as_secs(),
        }),
        request_id,
    );
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn ready(State(state): State<SharedState>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ready = state.health.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ResponseEnvelope::ok(
        serde_json::json!({ "ready": ready }),
        request_id,
    );
    (status, Json(body)).into_response()
}

pub async fn detail(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    if let Err(e) = authorize(&state.auth, &headers, "GET", "/v1/health", "", "read:health") {
        return e.into_response_with_request_id(&request_id);
    }

    let components: Vec<serde_json::Value> = state
        .health
        .detail()
        .into_iter()
        .map(|(name, status, message)| {
            let status = match status {
                ComponentStatus::Healthy => "healthy",
                ComponentStatus::Degraded => "degraded",
                ComponentStatus::Unhealthy => "unhealthy",
            };
            serde_json::json!({ "component": name, "status": status, "message": message })
        })
        .collect();

    let body = ResponseEnvelope::ok(
        serde_json::json!({ "components": components }),
        request_id,
    );
    (StatusCode::OK, Json(body)).into_response()
}
