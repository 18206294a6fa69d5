//! C10: Record-ID Codec.
//!
//! Opaque URL-safe base64 of `"<timestamp>|<unique_id>"`, used as the
//! `:id` path segment for detail-view lookups (§4.10).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{RecordIdError, RecordIdResult};

/// `encode`: join with `"|"`, base64-url encode.
pub fn encode(timestamp: &str, unique_id: &str) -> String {
    let joined = format!("{timestamp}|{unique_id}");
    URL_SAFE_NO_PAD.encode(joined)
}

/// `decode`: base64-url decode, split on the first `"|"`, reject if
/// either part is empty or the separator is missing.
pub fn decode(opaque: &str) -> RecordIdResult<(String, String)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(opaque)
        .map_err(|_| RecordIdError::BadEncoding)?;
    let joined = String::from_utf8(bytes).map_err(|_| RecordIdError::BadUtf8)?;
    let (timestamp, unique_id) = joined
        .split_once('|')
        .ok_or(RecordIdError::MissingSeparator)?;
    if timestamp.is_empty() || unique_id.is_empty() {
        return Err(RecordIdError::EmptyComponent);
    }
    Ok((timestamp.to_string(), unique_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let encoded = encode("2024-01-15T10:29:45Z", "req-abc");
        let (ts, uid) = decode(&encoded).unwrap();
        assert_eq!(ts, "2024-01-15T10:29:45Z");
        assert_eq!(uid, "req-abc");
    }

    #[test]
    fn rejects_bad_base64() {
        assert_eq!(decode("not base64!!"), Err(RecordIdError::BadEncoding));
    }

    #[test]
    fn rejects_missing_separator() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("no-separator-here");
        assert_eq!(decode(&encoded), Err(RecordIdError::MissingSeparator));
    }

    #[test]
    fn rejects_empty_component() {
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("|req-abc");
        assert_eq!(decode(&encoded), Err(RecordIdError::EmptyComponent));
        let encoded2 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("2024-01-15T10:29:45Z|");
        assert_eq!(decode(&encoded2), Err(RecordIdError::EmptyComponent));
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(ts in "[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z", uid in "[a-zA-Z0-9_-]{1,40}") {
            let encoded = encode(&ts, &uid);
            let (dts, duid) = decode(&encoded).unwrap();
            proptest::prop_assert_eq!(dts, ts);
            proptest::prop_assert_eq!(duid, uid);
        }
    }
}
