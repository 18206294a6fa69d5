//! §3/§9: the ingestion-edge event shape. The body is kept as an opaque
//! JSON value (§9 design notes: "Dynamic-shape payloads... model as an
//! opaque JSON-serializable value at the ingestion edge; only the
//! enrichment/storage layers need to look inside") — C6's dispatcher
//! doesn't interpret `details` at all, it only needs a stable `task_id`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The body every `/insert` endpoint accepts. `request_id` is caller
/// supplied when the caller wants idempotent retries to land on the same
/// `task_id`; when absent one is derived from the content hash instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Value,
}

/// Enriched record the worker eventually writes; the ingest process only
/// fills in what it knows (the caller's identity and the request's own
/// body) and leaves GeoIP/user-agent enrichment to the worker process,
/// per SPEC_FULL §4.13.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueuedEvent {
    pub request_id: String,
    pub client_id: String,
    pub remote_ip: Option<String>,
    pub user_agent: Option<String>,
    pub received_at: i64,
    pub details: serde_json::Value,
}

/// §3 JobPayload.`task_id`: "stable content-hashed string, <= 64 chars".
/// Derived from `(task_type, client_id, request_id or details)` so retries
/// of the exact same logical event within the dedup window collapse,
/// while distinct events from the same caller don't collide.
pub fn derive_task_id(task_type: &str, client_id: &str, req: &IngestRequest) -> String {
    if let Some(id) = &req.request_id {
        return format!("{client_id}:{id}");
    }
    let mut hasher = Sha256::new();
    hasher.update(task_type.as_bytes());
    hasher.update(client_id.as_bytes());
    hasher.update(req.details.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_request_id_is_reused_verbatim() {
        let req = IngestRequest {
            request_id: Some("req-abc".to_string()),
            details: serde_json::json!({"x": 1}),
        };
        assert_eq!(derive_task_id("user_activity.persist", "ab12", &req), "ab12:req-abc");
    }

    #[test]
    fn content_hash_is_stable_and_bounded() {
        let req = IngestRequest {
            request_id: None,
            details: serde_json::json!({"action": "login"}),
        };
        let id1 = derive_task_id("user_activity.persist", "ab12", &req);
        let id2 = derive_task_id("user_activity.persist", "ab12", &req);
        assert_eq!(id1, id2);
        assert!(id1.len() <= 64);
    }

    #[test]
    fn distinct_details_hash_differently() {
        let req_a = IngestRequest {
            request_id: None,
            details: serde_json::json!({"action": "login"}),
        };
        let req_b = IngestRequest {
            request_id: None,
            details: serde_json::json!({"action": "logout"}),
        };
        assert_ne!(
            derive_task_id("t", "c", &req_a),
            derive_task_id("t", "c", &req_b)
        );
    }
}
