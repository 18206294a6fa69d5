//! C3: Signature Verifier.
//!
//! Implements the seven-step algorithm in §4.3, composed from
//! `canonical::SignaturePayload` (wire bytes), `nonce::NonceStore`
//! (replay defense), and `registry::ClientRegistry` (credential lookup).

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier};
use hmac::{Hmac, Mac};
use ic_config::SignatureAlgorithm;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::canonical::SignaturePayload;
use crate::error::{SignatureError, SignatureResult};
use crate::nonce::{NonceCheck, NonceStore};
use crate::registry::{ClientEntry, ClientRegistry, Credential};

/// Allowed clock skew for a signed request, per §4.3 step 2.
pub const TIMESTAMP_WINDOW_SECS: i64 = 30;

pub struct SignatureVerifier {
    registry: std::sync::Arc<ClientRegistry>,
    nonces: std::sync::Arc<NonceStore>,
    algorithm: SignatureAlgorithm,
}

impl SignatureVerifier {
    pub fn new(
        registry: std::sync::Arc<ClientRegistry>,
        nonces: std::sync::Arc<NonceStore>,
        algorithm: SignatureAlgorithm,
    ) -> Self {
        Self {
            registry,
            nonces,
            algorithm,
        }
    }

    /// C3 `verify`: the seven-step signature algorithm.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        client_id: &str,
        timestamp_str: &str,
        nonce: &str,
        method: &str,
        path: &str,
        body: &str,
        signature_b64: &str,
        now: i64,
    ) -> SignatureResult<ClientEntry> {
        // 1. parse timestamp
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| SignatureError::BadTimestamp)?;

        // 2. clock-skew window
        if (now - timestamp).abs() > TIMESTAMP_WINDOW_SECS {
            return Err(SignatureError::Expired);
        }

        // 3. client lookup
        let entry = self
            .registry
            .get(client_id)
            .ok_or(SignatureError::UnknownClient)?;
        if !entry.active {
            return Err(SignatureError::InactiveClient);
        }

        // 4. nonce anti-replay
        if !nonce.is_empty() && self.nonces.check_and_insert(nonce, now) == NonceCheck::Replayed {
            return Err(SignatureError::ReplayedNonce);
        }

        // 5. canonical payload bytes
        let payload = SignaturePayload {
            client_id,
            timestamp,
            nonce,
            method,
            path,
            body,
        };
        let message = payload.canonical_bytes();

        // 6. decode + dispatch by auth_type
        let signature_bytes = B64
            .decode(signature_b64)
            .map_err(|_| SignatureError::BadSignatureEncoding)?;
        verify_signature(&entry.credential, self.algorithm, &message, &signature_bytes)?;

        // 7.
        Ok(entry)
    }
}

fn verify_signature(
    credential: &Credential,
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature_bytes: &[u8],
) -> SignatureResult<()> {
    match credential {
        Credential::Asymmetric(key) => {
            let sig_arr: [u8; 64] = signature_bytes
                .try_into()
                .map_err(|_| SignatureError::BadSignatureEncoding)?;
            let signature = Signature::from_bytes(&sig_arr);
            let digest: Vec<u8> = match algorithm {
                SignatureAlgorithm::Asymmetric256 => Sha256::digest(message).to_vec(),
                SignatureAlgorithm::Asymmetric512 => Sha512::digest(message).to_vec(),
                _ => message.to_vec(),
            };
            key.verify(&digest, &signature)
                .map_err(|_| SignatureError::SignatureMismatch)
        }
        Credential::Symmetric(secret) => {
            let expected = match algorithm {
                SignatureAlgorithm::Symmetric256 => hmac_digest::<Hmac<Sha256>>(secret, message),
                SignatureAlgorithm::Symmetric512 => hmac_digest::<Hmac<Sha512>>(secret, message),
                _ => return Err(SignatureError::SignatureMismatch),
            };
            if expected.ct_eq(signature_bytes).into() {
                Ok(())
            } else {
                Err(SignatureError::SignatureMismatch)
            }
        }
    }
}

fn hmac_digest<M>(secret: &[u8], message: &[u8]) -> Vec<u8>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = M::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_config::{AuthType, ClientConfigEntry, ConfigStore};
    use std::io::Write as _;
    use std::sync::Arc;

    fn registry_with_symmetric_client(secret: &str) -> Arc<ClientRegistry> {
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
                symmetric_secret: Some(secret.to_string()),
                permissions: vec!["read:ping".to_string()],
                active: true,
            })
            .unwrap();
        registry
    }

    fn sign(secret: &str, payload: &SignaturePayload) -> String {
        let mac_bytes = hmac_digest::<Hmac<Sha256>>(secret.as_bytes(), &payload.canonical_bytes());
        B64.encode(mac_bytes)
    }

    #[test]
    fn valid_request_verifies_and_returns_record() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = SignatureVerifier::new(
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "n1",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let sig = sign("s3cr3t", &payload);

        let record = verifier
            .verify(
                "ab12",
                "1700000000",
                "n1",
                "GET",
                "/v1/ping",
                "",
                &sig,
                1_700_000_010,
            )
            .unwrap();
        assert_eq!(record.client_id, "ab12");
    }

    #[test]
    fn replayed_nonce_is_rejected_on_second_use() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let nonces = NonceStore::new();
        let verifier =
            SignatureVerifier::new(registry, nonces, SignatureAlgorithm::Symmetric256);
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "dupe",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let sig = sign("s3cr3t", &payload);

        verifier
            .verify(
                "ab12",
                "1700000000",
                "dupe",
                "GET",
                "/v1/ping",
                "",
                &sig,
                1_700_000_010,
            )
            .unwrap();

        assert_eq!(
            verifier
                .verify(
                    "ab12",
                    "1700000000",
                    "dupe",
                    "GET",
                    "/v1/ping",
                    "",
                    &sig,
                    1_700_000_011,
                )
                .unwrap_err(),
            SignatureError::ReplayedNonce
        );
    }

    #[test]
    fn timestamp_outside_window_is_rejected() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = SignatureVerifier::new(
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
        let sig = sign("s3cr3t", &payload);

        assert_eq!(
            verifier
                .verify(
                    "ab12",
                    "1700000000",
                    "",
                    "GET",
                    "/v1/ping",
                    "",
                    &sig,
                    1_700_000_100,
                )
                .unwrap_err(),
            SignatureError::Expired
        );
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = SignatureVerifier::new(
            registry,
            NonceStore::new(),
            SignatureAlgorithm::Symmetric256,
        );
        assert_eq!(
            verifier
                .verify("ab12", "not-a-number", "", "GET", "/v1/ping", "", "", 1)
                .unwrap_err(),
            SignatureError::BadTimestamp
        );
    }
}
