use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::handshake::has_event;
use crate::types::{EventKind, NotificationEvent};

/// Reasons a notification body does not classify into an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("missing event block in payload")]
    MissingEvent,
    #[error("missing subscription.type in payload")]
    MissingType,
    #[error("unsupported subscription type: {0}")]
    UnsupportedType(String),
}

/// Pure mapping from a parsed notification body to a [`NotificationEvent`].
pub struct Classifier;

impl Classifier {
    /// Returns `None` for anything that is not a recognised status change.
    pub fn classify(body: &Value) -> Option<NotificationEvent> {
        Self::try_classify(body).ok()
    }

    /// Like [`Classifier::classify`] but explains why nothing was produced.
    pub fn try_classify(body: &Value) -> Result<NotificationEvent, ClassifyError> {
        if !has_event(body) {
            return Err(ClassifyError::MissingEvent);
        }
        let subscription_type = body
            .get("subscription")
            .and_then(|sub| sub.get("type"))
            .and_then(Value::as_str)
            .ok_or(ClassifyError::MissingType)?;
        let kind = EventKind::from_subscription_type(subscription_type)
            .ok_or_else(|| ClassifyError::UnsupportedType(subscription_type.to_string()))?;

        let raw_payload = body.get("event").cloned().unwrap_or(Value::Null);
        let event = StreamEvent::deserialize(&raw_payload).unwrap_or_default();

        let subject_id = event
            .broadcaster_user_id
            .or_else(|| {
                body.get("subscription")
                    .and_then(|sub| sub.get("condition"))
                    .and_then(|cond| cond.get("broadcaster_user_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|id| !id.is_empty());

        Ok(NotificationEvent {
            kind,
            subject_id,
            subject_login: event.broadcaster_user_login,
            subscription_type: subscription_type.to_string(),
            raw_payload,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    broadcaster_user_id: Option<String>,
    #[serde(default)]
    broadcaster_user_login: Option<String>,
}
