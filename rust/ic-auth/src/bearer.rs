//! C2: Bearer Verifier.
//!
//! Token shape: `base64url(claims_json).base64url(signature_bytes)`, the
//! same two-pass "parse claims without trusting them, then verify" shape
//! as `knhk-sidecar::kms`'s envelope handling — claims are decoded first
//! to recover `client_id`, the credential is looked up, and only then is
//! the signature itself checked.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier};
use hmac::{Hmac, Mac};
use ic_config::SignatureAlgorithm;
use serde::Deserialize;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{BearerError, BearerResult};
use crate::registry::{ClientRegistry, Credential};

/// Claims embedded in a bearer token (§4.2). `exp`/`nbf` are Unix seconds;
/// `nbf` is optional (absent means "valid since epoch").
#[derive(Debug, Deserialize)]
struct BearerClaims {
    client_id: String,
    exp: i64,
    #[serde(default)]
    nbf: Option<i64>,
}

/// Principal recovered from a verified bearer token.
pub struct BearerClaimsVerified {
    pub client_id: String,
    pub client_name: String,
    pub permissions: Vec<String>,
}

pub struct BearerVerifier {
    registry: std::sync::Arc<ClientRegistry>,
    algorithm: SignatureAlgorithm,
}

impl BearerVerifier {
    pub fn new(registry: std::sync::Arc<ClientRegistry>, algorithm: SignatureAlgorithm) -> Self {
        Self { registry, algorithm }
    }

    /// C2 `verify`: parse-then-verify, per §4.2.
    pub fn verify(&self, token: &str, now: i64) -> BearerResult<BearerClaimsVerified> {
        let (claims_part, sig_part) = token.split_once('.').ok_or(BearerError::Malformed)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_part)
            .map_err(|_| BearerError::Malformed)?;
        let claims: BearerClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| BearerError::Malformed)?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| BearerError::Malformed)?;

        let entry = self
            .registry
            .get(&claims.client_id)
            .ok_or(BearerError::UnknownClient)?;
        if !entry.active {
            return Err(BearerError::InactiveClient);
        }

        let credential_is_asymmetric = matches!(entry.credential, Credential::Asymmetric(_));
        if credential_is_asymmetric != self.algorithm.is_asymmetric() {
            return Err(BearerError::WrongAlgorithm);
        }

        verify_signature(&entry.credential, self.algorithm, &claims_bytes, &signature_bytes)?;

        if now < claims.nbf.unwrap_or(0) || now > claims.exp {
            return Err(BearerError::Expired);
        }

        Ok(BearerClaimsVerified {
            client_id: entry.client_id,
            client_name: entry.client_name,
            permissions: entry.permissions,
        })
    }
}

fn verify_signature(
    credential: &Credential,
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature_bytes: &[u8],
) -> BearerResult<()> {
    match credential {
        Credential::Asymmetric(key) => {
            let sig_arr: [u8; 64] = signature_bytes
                .try_into()
                .map_err(|_| BearerError::SignatureMismatch)?;
            let signature = Signature::from_bytes(&sig_arr);
            let digest: Vec<u8> = match algorithm {
                SignatureAlgorithm::Asymmetric256 => {
                    use sha2::Digest;
                    Sha256::digest(message).to_vec()
                }
                SignatureAlgorithm::Asymmetric512 => {
                    use sha2::Digest;
                    Sha512::digest(message).to_vec()
                }
                _ => message.to_vec(),
            };
            key.verify(&digest, &signature)
                .map_err(|_| BearerError::SignatureMismatch)
        }
        Credential::Symmetric(secret) => {
            let expected = match algorithm {
                SignatureAlgorithm::Symmetric256 => hmac_digest::<Hmac<Sha256>>(secret, message),
                SignatureAlgorithm::Symmetric512 => hmac_digest::<Hmac<Sha512>>(secret, message),
                _ => return Err(BearerError::WrongAlgorithm),
            };
            if expected.ct_eq(signature_bytes).into() {
                Ok(())
            } else {
                Err(BearerError::SignatureMismatch)
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
    use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
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

    fn sign_symmetric(secret: &str, claims_bytes: &[u8]) -> String {
        let expected = hmac_digest::<Hmac<Sha256>>(secret.as_bytes(), claims_bytes);
        B64.encode(expected)
    }

    #[test]
    fn valid_symmetric_token_verifies() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = BearerVerifier::new(registry, SignatureAlgorithm::Symmetric256);

        let claims = serde_json::json!({ "client_id": "ab12", "exp": 2_000_000_000 });
        let claims_bytes = serde_json::to_vec(&claims).unwrap();
        let claims_part = B64.encode(&claims_bytes);
        let sig_part = sign_symmetric("s3cr3t", &claims_bytes);
        let token = format!("{claims_part}.{sig_part}");

        let verified = verifier.verify(&token, 1_700_000_000).unwrap();
        assert_eq!(verified.client_id, "ab12");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = BearerVerifier::new(registry, SignatureAlgorithm::Symmetric256);

        let claims = serde_json::json!({ "client_id": "ab12", "exp": 2_000_000_000 });
        let claims_bytes = serde_json::to_vec(&claims).unwrap();
        let claims_part = B64.encode(&claims_bytes);
        let token = format!("{claims_part}.{}", B64.encode([0u8; 32]));

        assert_eq!(
            verifier.verify(&token, 1_700_000_000).unwrap_err(),
            BearerError::SignatureMismatch
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = BearerVerifier::new(registry, SignatureAlgorithm::Symmetric256);

        let claims = serde_json::json!({ "client_id": "ab12", "exp": 1_000 });
        let claims_bytes = serde_json::to_vec(&claims).unwrap();
        let claims_part = B64.encode(&claims_bytes);
        let sig_part = sign_symmetric("s3cr3t", &claims_bytes);
        let token = format!("{claims_part}.{sig_part}");

        assert_eq!(
            verifier.verify(&token, 1_700_000_000).unwrap_err(),
            BearerError::Expired
        );
    }

    #[test]
    fn malformed_token_without_separator_is_rejected() {
        let registry = registry_with_symmetric_client("s3cr3t");
        let verifier = BearerVerifier::new(registry, SignatureAlgorithm::Symmetric256);
        assert_eq!(
            verifier.verify("not-a-token", 1_700_000_000).unwrap_err(),
            BearerError::Malformed
        );
    }
}
