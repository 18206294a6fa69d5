//! C5: Auth Orchestrator.
//!
//! Selects a verifier by presented headers, applies the permission gate,
//! and hands back the `Principal` the HTTP layer attaches to the request
//! context. Deliberately framework-agnostic (no `axum` dependency here) —
//! `ic-http` adapts its extractors into `RequestHeaders`/`PresentedAuth`,
//! the same "transport adapter" split `knhk-workflow-engine`'s
//! `api::transport` module uses to keep the engine free of REST types.

use std::sync::Arc;

use tracing::warn;

use crate::bearer::BearerVerifier;
use crate::error::AuthError;
use crate::nonce::NonceStore;
use crate::permission;
use crate::principal::Principal;
use crate::registry::ClientRegistry;
use crate::signature::SignatureVerifier;

/// The subset of inbound request headers C5 needs to pick a verifier and,
/// for signed requests, build the canonical payload.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders<'a> {
    /// Full `Authorization` header value, including the `Bearer ` prefix.
    pub authorization: Option<&'a str>,
    pub client_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub signature: Option<&'a str>,
}

/// Which verifier a request presented credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentedAuth {
    Bearer,
    Signature,
    None,
}

impl<'a> RequestHeaders<'a> {
    fn presented(&self) -> PresentedAuth {
        if self
            .authorization
            .map(|h| h.starts_with("Bearer "))
            .unwrap_or(false)
        {
            PresentedAuth::Bearer
        } else if self.client_id.is_some() && self.signature.is_some() {
            PresentedAuth::Signature
        } else {
            PresentedAuth::None
        }
    }
}

pub struct AuthOrchestrator {
    enabled: bool,
    registry: Arc<ClientRegistry>,
    bearer: BearerVerifier,
    signature: SignatureVerifier,
}

impl AuthOrchestrator {
    pub fn new(
        enabled: bool,
        registry: Arc<ClientRegistry>,
        nonces: Arc<NonceStore>,
        algorithm: ic_config::SignatureAlgorithm,
    ) -> Self {
        let bearer = BearerVerifier::new(registry.clone(), algorithm);
        let signature = SignatureVerifier::new(registry.clone(), nonces, algorithm);
        Self {
            enabled,
            registry,
            bearer,
            signature,
        }
    }

    /// C5 `authorize`: `None` means `auth.enabled` is `false` and the
    /// caller should pass through without a principal, per §4.5.
    pub fn authorize(
        &self,
        method: &str,
        path: &str,
        body: &str,
        headers: &RequestHeaders<'_>,
        required_permission: &str,
        now: i64,
    ) -> Result<Option<Principal>, AuthError> {
        if !self.enabled {
            return Ok(None);
        }

        let principal = match headers.presented() {
            PresentedAuth::Bearer => {
                let token = headers
                    .authorization
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .ok_or(AuthError::MissingAuth)?;
                let claims = self.bearer.verify(token, now)?;
                Principal {
                    client_id: claims.client_id,
                    client_name: claims.client_name,
                    permissions: claims.permissions,
                }
            }
            PresentedAuth::Signature => {
                let client_id = headers.client_id.ok_or(AuthError::MissingAuth)?;
                let timestamp = headers.timestamp.ok_or(AuthError::MissingAuth)?;
                let signature = headers.signature.ok_or(AuthError::MissingAuth)?;
                let nonce = headers.nonce.unwrap_or("");
                let record = self.signature.verify(
                    client_id, timestamp, nonce, method, path, body, signature, now,
                )?;
                Principal {
                    client_id: record.client_id,
                    client_name: record.client_name,
                    permissions: record.permissions,
                }
            }
            PresentedAuth::None => return Err(AuthError::MissingAuth),
        };

        if !permission::has(&principal.permissions, required_permission) {
            warn!(
                client_id = %principal.client_id,
                required = required_permission,
                "insufficient permission"
            );
            return Err(AuthError::InsufficientPermission(
                required_permission.to_string(),
            ));
        }

        Ok(Some(principal))
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::SignaturePayload;
    use crate::nonce::NonceStore;
    use base64::engine::general_purpose::STANDARD as B64;
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use ic_config::{AuthType, ClientConfigEntry, ConfigStore, SignatureAlgorithm};
    use sha2::Sha256;
    use std::io::Write as _;

    fn setup(perms: Vec<String>) -> Arc<ClientRegistry> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
    "app": {{ "name": "ic", "port": 8080 }},
    "influxdb": {{ "url": "http://x", "token": "t", "org": "o", "bucket": "b" }},
    "redis": {{ "url": "redis://x" }},
    "asynq": {{ "concurrency": 1 }},
    "auth": {{ "enabled": true, "algorithm": "SYM256", "clients": [] }},
    "maxmind": {{}}
}}"#
        )
        .unwrap();
        let store = ConfigStore::load(f.path()).unwrap();
        let config = Arc::new(parking_lot::Mutex::new(store));
        let registry = ClientRegistry::init(config).unwrap();
        registry
            .add(ClientConfigEntry {
                client_id: "ab12".to_string(),
                client_name: "test".to_string(),
                auth_type: AuthType::Symmetric,
                public_key_path: None,
                symmetric_secret: Some("S".to_string()),
                permissions: perms,
                active: true,
            })
            .unwrap();
        registry
    }

    #[test]
    fn missing_auth_fails_when_enabled() {
        let registry = setup(vec!["read:ping".to_string()]);
        let orch = AuthOrchestrator::new(
            true,
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        let headers = RequestHeaders::default();
        assert_eq!(
            orch.authorize("GET", "/v1/ping", "", &headers, "read:ping", 1),
            Err(AuthError::MissingAuth)
        );
    }

    #[test]
    fn disabled_auth_passes_through() {
        let registry = setup(vec![]);
        let orch = AuthOrchestrator::new(
            false,
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        let headers = RequestHeaders::default();
        assert_eq!(
            orch.authorize("GET", "/v1/ping", "", &headers, "read:ping", 1),
            Ok(None)
        );
    }

    #[test]
    fn valid_signature_with_sufficient_permission_succeeds() {
        let registry = setup(vec!["read:ping".to_string()]);
        let orch = AuthOrchestrator::new(
            true,
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let mut mac = Hmac::<Sha256>::new_from_slice(b"S").unwrap();
        mac.update(&payload.canonical_bytes());
        let sig = B64.encode(mac.finalize().into_bytes());

        let headers = RequestHeaders {
            client_id: Some("ab12"),
            timestamp: Some("1700000000"),
            signature: Some(&sig),
            ..Default::default()
        };
        let principal = orch
            .authorize("GET", "/v1/ping", "", &headers, "read:ping", 1_700_000_010)
            .unwrap()
            .unwrap();
        assert_eq!(principal.client_id, "ab12");
    }

    #[test]
    fn insufficient_permission_is_rejected() {
        let registry = setup(vec!["read:ping".to_string()]);
        let orch = AuthOrchestrator::new(
            true,
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let mut mac = Hmac::<Sha256>::new_from_slice(b"S").unwrap();
        mac.update(&payload.canonical_bytes());
        let sig = B64.encode(mac.finalize().into_bytes());

        let headers = RequestHeaders {
            client_id: Some("ab12"),
            timestamp: Some("1700000000"),
            signature: Some(&sig),
            ..Default::default()
        };
        assert!(matches!(
            orch.authorize("GET", "/v1/ping", "", &headers, "write:ping", 1_700_000_010),
            Err(AuthError::InsufficientPermission(_))
        ));
    }
}
