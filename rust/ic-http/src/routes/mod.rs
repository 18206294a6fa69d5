//! Route table assembly. One `axum::Router` per process, built from the
//! literal `/v1/...` table in §6.

pub mod debug;
pub mod events;
pub mod health;
pub mod ping;

use axum::routing::{get, post};
use axum::Router;

use crate::envelope::not_found_route;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/v1/health/live", get(health::live))
        .route("/v1/health/ready", get(health::ready))
        .route("/v1/health", get(health::detail))
        .route("/v1/ping", get(ping::ping))
        .route(
            "/v1/user-activities/insert",
            post(events::insert_user_activities),
        )
        .route(
            "/v1/user-activities/list",
            post(events::list_user_activities),
        )
        .route(
            "/v1/user-activities/:id",
            get(events::detail_user_activities),
        )
        .route(
            "/v1/security-events/insert",
            post(events::insert_security_events),
        )
        .route(
            "/v1/security-events/list",
            post(events::list_security_events),
        )
        .route(
            "/v1/security-events/:id",
            get(events::detail_security_events),
        )
        .route(
            "/v1/transaction-events/insert",
            post(events::insert_transaction_events),
        )
        .route(
            "/v1/transaction-events/list",
            post(events::list_transaction_events),
        )
        .route(
            "/v1/transaction-events/:id",
            get(events::detail_transaction_events),
        )
        .route(
            "/v1/callback-logs/insert",
            post(events::insert_callback_logs),
        )
        .route("/v1/callback-logs/list", post(events::list_callback_logs))
        .route(
            "/v1/callback-logs/:id",
            get(events::detail_callback_logs),
        )
        .fallback(fallback);

    if debug::enabled() {
        router = router.route("/v1/debug/connections", get(debug::connections));
    }

    router.with_state(state)
}

async fn fallback() -> axum::response::Response {
    use axum::response::IntoResponse;
    not_found_route().into_response()
}
