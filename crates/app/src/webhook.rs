use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use metrics::{counter, histogram};
use serde_json::Value;
use streamhook_core::{
    classifier::Classifier,
    handshake::handshake_challenge,
    signature::{self, split_signature_header},
    types::{ChallengeToken, EventKind, VerificationOutcome},
};
use tracing::{debug, info, warn};

use crate::rejection::{IngressRejection, ProtocolError};
use crate::router::AppState;

pub const WEBHOOK_PATH: &str = "/eventsub/webhook";

const HEADER_MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
const HEADER_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
const HEADER_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";

/// Routes served by the webhook gateway, merged into the app router.
pub fn routes() -> Router<AppState> {
    Router::new().route(WEBHOOK_PATH, post(handle))
}

/// Successful terminal states. All of them answer `200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    FastPathDuplicate,
    Duplicate,
    Handshake(ChallengeToken),
    Dispatched(EventKind),
    Unrecognized,
}

impl Acknowledgement {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::FastPathDuplicate => "fast_path_duplicate",
            Self::Duplicate => "duplicate",
            Self::Handshake(_) => "handshake",
            Self::Dispatched(_) => "dispatched",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl IntoResponse for Acknowledgement {
    fn into_response(self) -> Response {
        match self {
            Self::Handshake(challenge) => {
                let mut response = (StatusCode::OK, challenge.into_inner()).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain"),
                );
                response
            }
            _ => StatusCode::OK.into_response(),
        }
    }
}

enum RequiredHeader<'a> {
    Present(&'a str),
    Missing,
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> RequiredHeader<'a> {
    match headers.get(name).and_then(|value| value.to_str().ok()) {
        Some(value) => RequiredHeader::Present(value),
        None => RequiredHeader::Missing,
    }
}

/// The facts of one request the gateway needs, captured before parsing.
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    pub delivery_id: String,
    pub timestamp: String,
    pub algorithm: String,
    pub claimed_digest: String,
    pub body: Bytes,
}

impl InboundDelivery {
    pub fn capture(headers: &HeaderMap, body: Bytes) -> Result<Self, ProtocolError> {
        let signature = required_header(headers, HEADER_SIGNATURE);
        let delivery_id = required_header(headers, HEADER_MESSAGE_ID);
        let timestamp = required_header(headers, HEADER_TIMESTAMP);

        let (
            RequiredHeader::Present(signature),
            RequiredHeader::Present(delivery_id),
            RequiredHeader::Present(timestamp),
        ) = (signature, delivery_id, timestamp)
        else {
            return Err(ProtocolError::MissingHeaders);
        };

        // A value without '=' cannot name the algorithm; it fails verification.
        let (algorithm, claimed_digest) =
            split_signature_header(signature).unwrap_or((signature, ""));

        Ok(Self {
            delivery_id: delivery_id.to_string(),
            timestamp: timestamp.to_string(),
            algorithm: algorithm.to_string(),
            claimed_digest: claimed_digest.to_string(),
            body,
        })
    }

    /// Parses the body, which must be a JSON object.
    pub fn parse_body(&self) -> Result<Value, ProtocolError> {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(ProtocolError::MalformedBody),
        }
    }

    pub fn verify(&self, secret: &[u8]) -> VerificationOutcome {
        let message = signature::canonical_message(&self.delivery_id, &self.timestamp, &self.body);
        if signature::verify(&self.algorithm, &self.claimed_digest, &message, secret) {
            VerificationOutcome::Verified
        } else {
            VerificationOutcome::SignatureMismatch
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Acknowledgement, IngressRejection> {
    let start = Instant::now();
    let result = ingest(&state, &headers, body);

    let outcome = match &result {
        Ok(ack) => ack.outcome_label(),
        Err(rejection) => {
            debug!(
                stage = "ingress",
                verification = ?rejection.verification_outcome(),
                status = rejection.status().as_u16(),
                "delivery rejected"
            );
            rejection.outcome_label()
        }
    };
    counter!("eventsub_ingress_total", "outcome" => outcome).increment(1);
    histogram!("webhook_ack_latency_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());

    result
}

fn ingest(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Acknowledgement, IngressRejection> {
    let delivery = InboundDelivery::capture(headers, body).map_err(|err| {
        warn!(stage = "ingress", error = %err, "rejecting delivery without required headers");
        err
    })?;
    let message_id = delivery.delivery_id.as_str();

    let parsed = delivery.parse_body().map_err(|err| {
        warn!(
            stage = "ingress",
            %message_id,
            body_len = delivery.body.len(),
            "rejecting malformed body"
        );
        err
    })?;

    if state.last_delivery().matches(message_id) {
        debug!(stage = "ingress", %message_id, "repeat of last delivery acknowledged");
        return Ok(Acknowledgement::FastPathDuplicate);
    }

    let outcome = delivery.verify(&state.webhook_secret());
    if !outcome.is_verified() {
        state.dedupe().record(message_id);
        counter!("eventsub_invalid_signature_total").increment(1);
        warn!(stage = "signature", %message_id, ?outcome, "signature verification failed");
        return Err(IngressRejection::Authentication);
    }

    if state.dedupe().check_and_record(message_id) {
        info!(stage = "dedupe", %message_id, "duplicate delivery acknowledged");
        return Ok(Acknowledgement::Duplicate);
    }

    if let Some(challenge) = handshake_challenge(&parsed) {
        state.last_delivery().set(message_id);
        info!(stage = "ingress", %message_id, "answering subscription handshake");
        return Ok(Acknowledgement::Handshake(challenge));
    }

    let ack = match Classifier::try_classify(&parsed) {
        Ok(event) => {
            let kind = event.kind;
            info!(
                stage = "ingress",
                %message_id,
                kind = kind.as_str(),
                subject_id = event.subject_id.as_deref().unwrap_or(""),
                "dispatching status change"
            );
            state.dispatcher().dispatch(event);
            Acknowledgement::Dispatched(kind)
        }
        Err(reason) => {
            info!(
                stage = "ingress",
                %message_id,
                %reason,
                "notification acknowledged without dispatch"
            );
            Acknowledgement::Unrecognized
        }
    };
    state.last_delivery().set(message_id);

    Ok(ack)
}
