//! §3 SignaturePayload: the byte-exact canonical serialization shared by
//! signing and verifying. Field order and minified-JSON serialization are
//! part of the wire protocol, not an implementation detail — any change
//! here breaks cross-language interop (§3 invariant, §9 design notes).

use serde::Serialize;

#[derive(Serialize)]
pub struct SignaturePayload<'a> {
    pub client_id: &'a str,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub nonce: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a str,
}

impl<'a> SignaturePayload<'a> {
    /// Minified JSON bytes in the declared field order. `serde_json`
    /// serializes struct fields in declaration order regardless of the
    /// `preserve_order` feature (that feature only affects `Value`/maps),
    /// so this is stable across the whole dependency tree.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("SignaturePayload always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_and_nonce_omission() {
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let bytes = payload.canonical_bytes();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"client_id":"ab12","timestamp":1700000000,"method":"GET","path":"/v1/ping","body":""}"#
        );
    }

    #[test]
    fn nonce_included_when_present() {
        let payload = SignaturePayload {
            client_id: "ab12",
            timestamp: 1_700_000_000,
            nonce: "n1",
            method: "GET",
            path: "/v1/ping",
            body: "",
        };
        let bytes = payload.canonical_bytes();
        assert!(String::from_utf8(bytes).unwrap().contains(r#""nonce":"n1""#));
    }
}
