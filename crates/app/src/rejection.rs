use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use streamhook_core::types::VerificationOutcome;
use thiserror::Error;

/// Mistakes by the sender in the shape of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Missing required Twitch EventSub headers")]
    MissingHeaders,
    #[error("Malformed data received")]
    MalformedBody,
}

/// A delivery the gateway refuses to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IngressRejection {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Deliberately carries no detail about which check failed.
    #[error("Invalid signature")]
    Authentication,
}

impl IngressRejection {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::FORBIDDEN,
        }
    }

    pub fn outcome_label(self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::MissingHeaders) => "missing_headers",
            Self::Protocol(ProtocolError::MalformedBody) => "malformed",
            Self::Authentication => "forbidden",
        }
    }

    pub fn verification_outcome(self) -> VerificationOutcome {
        match self {
            Self::Protocol(ProtocolError::MissingHeaders) => VerificationOutcome::MissingHeaders,
            Self::Protocol(ProtocolError::MalformedBody) => VerificationOutcome::MalformedBody,
            Self::Authentication => VerificationOutcome::SignatureMismatch,
        }
    }
}

impl IntoResponse for IngressRejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
