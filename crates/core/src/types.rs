use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal stream status a notification maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Online,
    Offline,
}

impl EventKind {
    /// Maps an upstream subscription type onto the closed set of kinds.
    pub fn from_subscription_type(value: &str) -> Option<Self> {
        match value {
            "stream.online" => Some(Self::Online),
            "stream.offline" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// Coarse status carried by the analytics signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Online,
    Offline,
}

impl StreamStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl From<EventKind> for StreamStatus {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Online => Self::Online,
            EventKind::Offline => Self::Offline,
        }
    }
}

/// A verified, non-duplicate status-change notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    /// Broadcaster the status change is about, when the payload names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_login: Option<String>,
    pub subscription_type: String,
    /// The `event` section of the delivery, untouched.
    pub raw_payload: Value,
}

/// Opaque handshake token that must be echoed back byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Result of checking one delivery against the trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    SignatureMismatch,
    MissingHeaders,
    MalformedBody,
}

impl VerificationOutcome {
    pub fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// A delivery identifier remembered by the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeRecord {
    pub delivery_id: String,
    pub seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_types_map_to_closed_set() {
        assert_eq!(
            EventKind::from_subscription_type("stream.online"),
            Some(EventKind::Online)
        );
        assert_eq!(
            EventKind::from_subscription_type("stream.offline"),
            Some(EventKind::Offline)
        );
        assert_eq!(EventKind::from_subscription_type("channel.follow"), None);
        assert_eq!(EventKind::from_subscription_type("STREAM.ONLINE"), None);
    }

    #[test]
    fn status_follows_kind() {
        assert_eq!(StreamStatus::from(EventKind::Online), StreamStatus::Online);
        assert_eq!(StreamStatus::from(EventKind::Offline).as_str(), "offline");
    }
}
