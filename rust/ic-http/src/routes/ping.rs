//! `GET /v1/ping`: the minimal authenticated liveness probe used in the
//! spec's literal signature-verification walkthrough (`read:ping`).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::auth_mw::authorize;
use crate::envelope::ResponseEnvelope;
use crate::state::SharedState;

pub async fn ping(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let request_id = Uuid::new_v4().to_string();
    if let Err(e) = authorize(&state.auth, &headers, "GET", "/v1/ping", "", "read:ping") {
        return e.into_response_with_request_id(&request_id);
    }
    let body = ResponseEnvelope::ok(serde_json::json!({ "responses": "pong" }), request_id);
    (axum::http::StatusCode::OK, Json(body)).into_response()
}
