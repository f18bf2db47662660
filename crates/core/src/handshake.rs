use serde_json::Value;

use crate::types::ChallengeToken;

/// A delivery is a handshake when it carries a string `challenge` and no
/// `event` section. A `null` event counts as absent.
pub fn is_handshake(body: &Value) -> bool {
    challenge_of(body).is_some() && !has_event(body)
}

/// Extracts the challenge verbatim.
pub fn challenge_of(body: &Value) -> Option<ChallengeToken> {
    body.get("challenge")
        .and_then(Value::as_str)
        .map(ChallengeToken::new)
}

/// Returns the challenge only when `body` is a handshake.
pub fn handshake_challenge(body: &Value) -> Option<ChallengeToken> {
    if has_event(body) {
        return None;
    }
    challenge_of(body)
}

pub(crate) fn has_event(body: &Value) -> bool {
    body.get("event").is_some_and(|event| !event.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_verification_payload() {
        let body = json!({
            "challenge": "pogchamp-kappa-360noscope-vohiyo",
            "subscription": {"type": "stream.online", "version": "1"}
        });
        assert!(is_handshake(&body));
        assert_eq!(
            handshake_challenge(&body).map(ChallengeToken::into_inner),
            Some("pogchamp-kappa-360noscope-vohiyo".to_string())
        );
    }

    #[test]
    fn event_section_disqualifies_handshake() {
        let body = json!({
            "challenge": "abc123",
            "subscription": {"type": "stream.online"},
            "event": {"broadcaster_user_id": "1337"}
        });
        assert!(!is_handshake(&body));
        assert!(handshake_challenge(&body).is_none());
    }

    #[test]
    fn null_event_is_treated_as_absent() {
        let body = json!({"challenge": "abc123", "event": null});
        assert!(is_handshake(&body));
    }

    #[test]
    fn non_string_challenge_is_not_a_handshake() {
        assert!(!is_handshake(&json!({"challenge": 42})));
        assert!(!is_handshake(&json!({"subscription": {"type": "stream.online"}})));
    }

    #[test]
    fn challenge_is_preserved_exactly() {
        let body = json!({"challenge": "  spaced\ttoken\n"});
        assert_eq!(
            challenge_of(&body).expect("challenge").as_str(),
            "  spaced\ttoken\n"
        );
    }
}
