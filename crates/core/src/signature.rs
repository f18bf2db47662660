//! HMAC-SHA256 verification of EventSub deliveries.
//!
//! The signed message is `message_id || timestamp || raw_body` with no
//! separators. The body must be the bytes exactly as received.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The only algorithm accepted in the signature header.
pub const ACCEPTED_ALGORITHM: &str = "sha256";

/// Builds the canonical byte string the sender signs.
pub fn canonical_message(delivery_id: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(delivery_id.len() + timestamp.len() + body.len());
    message.extend_from_slice(delivery_id.as_bytes());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    message
}

/// Splits a `algorithm=hexDigest` header value on the first `=`.
pub fn split_signature_header(value: &str) -> Option<(&str, &str)> {
    value.split_once('=')
}

/// Checks `claimed_digest` (lowercase or uppercase hex) against the keyed
/// digest of `message`.
///
/// Unknown algorithms, non-hex digests and digests of the wrong length all
/// return `false`. The byte comparison runs in constant time.
pub fn verify(algorithm: &str, claimed_digest: &str, message: &[u8], secret: &[u8]) -> bool {
    if algorithm != ACCEPTED_ALGORITHM {
        return false;
    }
    let Ok(claimed) = hex::decode(claimed_digest) else {
        return false;
    };
    let Some(expected) = digest(message, secret) else {
        return false;
    };
    expected.as_slice().ct_eq(claimed.as_slice()).into()
}

/// Produces the header value a sender would attach, `sha256=<hex>`.
pub fn sign(message: &[u8], secret: &[u8]) -> Option<String> {
    digest(message, secret).map(|bytes| format!("{ACCEPTED_ALGORITHM}={}", hex::encode(bytes)))
}

fn digest(message: &[u8], secret: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn sample_message() -> Vec<u8> {
        canonical_message(
            "msg-1",
            "2024-01-01T00:00:00.000Z",
            br#"{"subscription":{"type":"stream.online"},"event":{}}"#,
        )
    }

    fn header_parts(header: &str) -> (String, String) {
        let (algorithm, digest) = split_signature_header(header).expect("header has '='");
        (algorithm.to_string(), digest.to_string())
    }

    #[test]
    fn canonical_message_concatenates_without_separators() {
        let message = canonical_message("id", "ts", b"{}");
        assert_eq!(message, b"idts{}".to_vec());
    }

    #[test]
    fn accepts_matching_digest() {
        let message = sample_message();
        let header = sign(&message, SECRET).expect("sign");
        let (algorithm, digest) = header_parts(&header);

        assert_eq!(algorithm, "sha256");
        assert!(verify(&algorithm, &digest, &message, SECRET));
        assert!(verify(&algorithm, &digest.to_uppercase(), &message, SECRET));
    }

    #[test]
    fn rejects_other_algorithms() {
        let message = sample_message();
        let header = sign(&message, SECRET).expect("sign");
        let (_, digest) = header_parts(&header);

        assert!(!verify("sha1", &digest, &message, SECRET));
        assert!(!verify("SHA256", &digest, &message, SECRET));
        assert!(!verify("", &digest, &message, SECRET));
    }

    #[test]
    fn any_flipped_bit_is_a_mismatch() {
        let message = sample_message();
        let header = sign(&message, SECRET).expect("sign");
        let (algorithm, digest) = header_parts(&header);
        let bytes = hex::decode(&digest).expect("hex");

        for index in 0..bytes.len() {
            for bit in 0..8 {
                let mut tampered = bytes.clone();
                tampered[index] ^= 1 << bit;
                assert!(
                    !verify(&algorithm, &hex::encode(&tampered), &message, SECRET),
                    "byte {index} bit {bit} should not verify"
                );
            }
        }
    }

    #[test]
    fn malformed_digests_are_mismatches() {
        let message = sample_message();
        assert!(!verify("sha256", "not-hex", &message, SECRET));
        assert!(!verify("sha256", "deadbeef", &message, SECRET));
        assert!(!verify("sha256", "", &message, SECRET));
        assert!(!verify("sha256", "abc", &message, SECRET));
    }

    #[test]
    fn body_and_key_changes_invalidate_signature() {
        let message = sample_message();
        let header = sign(&message, SECRET).expect("sign");
        let (algorithm, digest) = header_parts(&header);

        let reserialized = canonical_message(
            "msg-1",
            "2024-01-01T00:00:00.000Z",
            br#"{"subscription": {"type": "stream.online"}, "event": {}}"#,
        );
        assert!(!verify(&algorithm, &digest, &reserialized, SECRET));
        assert!(!verify(&algorithm, &digest, &message, b"other-secret"));
    }

    #[test]
    fn splits_on_first_equals_only() {
        assert_eq!(split_signature_header("sha256=ab=cd"), Some(("sha256", "ab=cd")));
        assert_eq!(split_signature_header("sha256"), None);
    }
}
