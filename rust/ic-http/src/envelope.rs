//! §4.14 / §6-§7: the response envelope every endpoint returns, and the
//! mapping of every typed component error onto the 5-digit code scheme.
//!
//! Grounded on `knhk-workflow-engine::api::transport::rest::RestAdapter`
//! (an `ApiError` with `code`/`message`, converted to a JSON body plus
//! `StatusCode` by one central adapter) generalized to emit the envelope
//! shape and numeric code §6/§7 specify instead of a string error code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ic_auth::error::{AuthError, BearerError, RegistryError, SignatureError};
use ic_query::{BackendError, QueryBuilderError, RecordIdError};
use ic_queue::DispatchError;

/// §6: the envelope every endpoint returns.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope<T: Serialize> {
    pub success: bool,
    pub code: u32,
    pub data: T,
    pub message: String,
    pub request_id: String,
}

impl<T: Serialize> ResponseEnvelope<T> {
    pub fn ok(data: T, request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            code: 0,
            data,
            message: "ok".to_string(),
            request_id: request_id.into(),
        }
    }
}

/// Typed API failure: an HTTP status plus a 5-digit envelope `code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: u32,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, subtype: u32, message: impl Into<String>) -> Self {
        Self {
            code: code_for(status, subtype),
            status,
            message: message.into(),
        }
    }

    pub fn into_response_with_request_id(self, request_id: &str) -> Response {
        let body = ResponseEnvelope {
            success: false,
            code: self.code,
            data: serde_json::Value::Null,
            message: self.message,
            request_id: request_id.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Fallback for errors raised before a request-scoped id was minted (e.g.
/// axum extractor rejections). Handlers that already have a `request_id`
/// should prefer `into_response_with_request_id`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.into_response_with_request_id(&request_id)
    }
}

/// Fixed status -> 2-digit prefix table. Confirmed by the spec's literal
/// scenarios: `401` -> `41` (S2/S3), `404` -> `44` (S5). Not derived by a
/// formula — recorded as a table so the two confirmed values stay
/// correct regardless of how the unconfirmed ones are chosen.
fn status_prefix(status: StatusCode) -> u32 {
    match status {
        StatusCode::BAD_REQUEST => 40,
        StatusCode::UNAUTHORIZED => 41,
        StatusCode::FORBIDDEN => 43,
        StatusCode::NOT_FOUND => 44,
        StatusCode::CONFLICT => 49,
        StatusCode::UNPROCESSABLE_ENTITY => 42,
        StatusCode::TOO_MANY_REQUESTS => 29,
        StatusCode::BAD_GATEWAY => 52,
        StatusCode::SERVICE_UNAVAILABLE => 53,
        StatusCode::GATEWAY_TIMEOUT => 54,
        _ => 50,
    }
}

fn code_for(status: StatusCode, subtype: u32) -> u32 {
    status_prefix(status) * 1000 + subtype
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingAuth => {
                ApiError::new(StatusCode::UNAUTHORIZED, 0, "no authentication credential presented")
            }
            AuthError::InsufficientPermission(perm) => ApiError::new(
                StatusCode::FORBIDDEN,
                0,
                format!("insufficient permission for {perm}"),
            ),
            AuthError::Bearer(b) => b.into(),
            AuthError::Signature(s) => s.into(),
        }
    }
}

impl From<BearerError> for ApiError {
    fn from(e: BearerError) -> Self {
        let (subtype, message) = match &e {
            BearerError::Malformed => (1, "malformed bearer token"),
            BearerError::UnknownClient => (2, "unknown client_id in token"),
            BearerError::InactiveClient => (3, "client is inactive"),
            BearerError::WrongAlgorithm => (4, "token algorithm mismatch"),
            BearerError::Expired => (5, "token expired or not yet valid"),
            BearerError::SignatureMismatch => (6, "bearer signature mismatch"),
        };
        ApiError::new(StatusCode::UNAUTHORIZED, subtype, message)
    }
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        let (subtype, message) = match &e {
            SignatureError::BadTimestamp => (7, "malformed timestamp"),
            SignatureError::Expired => (5, "signature timestamp outside allowed window"),
            SignatureError::UnknownClient => (9, "unknown client_id"),
            SignatureError::InactiveClient => (10, "client is inactive"),
            SignatureError::ReplayedNonce => (8, "Nonce replay attack detected"),
            SignatureError::BadSignatureEncoding => (11, "malformed signature encoding"),
            SignatureError::SignatureMismatch => (12, "signature mismatch"),
        };
        ApiError::new(StatusCode::UNAUTHORIZED, subtype, message)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, 1, e.to_string())
    }
}

impl From<QueryBuilderError> for ApiError {
    fn from(e: QueryBuilderError) -> Self {
        let subtype = match &e {
            QueryBuilderError::InvalidLength => 0,
            QueryBuilderError::InvalidDirection => 1,
            QueryBuilderError::InvalidCursor => 2,
            QueryBuilderError::InvalidDateFormat => 3,
            QueryBuilderError::StartAfterEnd => 4,
        };
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, subtype, e.to_string())
    }
}

impl From<RecordIdError> for ApiError {
    fn from(e: RecordIdError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, 3, e.to_string())
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match &e {
            BackendError::Timeout(_) => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, 0, e.to_string())
            }
            _ => ApiError::new(StatusCode::BAD_GATEWAY, 0, e.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match &e {
            DispatchError::Timeout(_) => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, 1, e.to_string())
            }
            _ => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, 2, e.to_string()),
        }
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, 0, message)
}

pub fn not_found_record() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, 0, "record not found")
}

pub fn not_found_route() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, 1, "unknown endpoint")
}
