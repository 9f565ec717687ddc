//! Error handling

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::flow::FlowError;
use crate::gateway::{ErrorKind, GatewayError, Operation};
use crate::payload::DataUriError;

/// Errors surfaced by the scalpscan HTTP API.
#[derive(Debug)]
pub enum ScalpscanError {
    /// The request body was unusable
    BadRequest(String),
    /// The request body was over the configured limit
    PayloadTooLarge,
    /// The session flow rejected the request
    Flow(FlowError),
    /// The gateway call failed
    Gateway(Operation, GatewayError),
    /// When an internal server error occurs
    InternalServerError(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable kind, eg `safety_block`
    pub kind: &'static str,
    /// Fixed user-facing message
    pub message: String,
}

impl std::fmt::Display for ScalpscanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "Bad request: {message}"),
            Self::PayloadTooLarge => write!(f, "Request body too large"),
            Self::Flow(err) => write!(f, "{err}"),
            Self::Gateway(operation, err) => write!(f, "{operation:?} failed: {err}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for ScalpscanError {}

impl From<JsonRejection> for ScalpscanError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ScalpscanError::PayloadTooLarge
        } else {
            ScalpscanError::BadRequest(rejection.body_text())
        }
    }
}

impl From<FlowError> for ScalpscanError {
    fn from(err: FlowError) -> Self {
        ScalpscanError::Flow(err)
    }
}

impl From<DataUriError> for ScalpscanError {
    fn from(err: DataUriError) -> Self {
        ScalpscanError::BadRequest(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for ScalpscanError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ScalpscanError::InternalServerError(err.to_string())
    }
}

/// HTTP status for a gateway failure kind.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingCredential | ErrorKind::QuotaExceeded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SafetyBlock => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ParseError
        | ErrorKind::NoImageReturned
        | ErrorKind::GenerationStopped
        | ErrorKind::Upstream
        | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
    }
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::MissingCredential => "missing_credential",
        ErrorKind::QuotaExceeded => "quota_exceeded",
        ErrorKind::SafetyBlock => "safety_block",
        ErrorKind::ParseError => "parse_error",
        ErrorKind::NoImageReturned => "no_image_returned",
        ErrorKind::GenerationStopped => "generation_stopped",
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::Upstream => "upstream",
        ErrorKind::Transport => "transport",
    }
}

impl IntoResponse for ScalpscanError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ScalpscanError::BadRequest(message) => {
                info!("Bad request received: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        kind: "bad_request",
                        message: "The request could not be understood.".to_string(),
                    },
                )
            }
            ScalpscanError::PayloadTooLarge => {
                info!("Rejected oversized request body");
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    ErrorBody {
                        kind: "payload_too_large",
                        message: "The photo is too large. Please upload a smaller image."
                            .to_string(),
                    },
                )
            }
            ScalpscanError::Flow(FlowError::Busy) => {
                info!("Rejected overlapping request");
                (
                    StatusCode::CONFLICT,
                    ErrorBody {
                        kind: "busy",
                        message: "Please wait for the current request to finish.".to_string(),
                    },
                )
            }
            ScalpscanError::Flow(err @ FlowError::InvalidTransition { .. }) => {
                info!("Rejected request: {}", err);
                (
                    StatusCode::CONFLICT,
                    ErrorBody {
                        kind: "invalid_transition",
                        message: "Please analyze a photo first.".to_string(),
                    },
                )
            }
            ScalpscanError::Gateway(operation, err) => {
                let kind = err.kind();
                match kind {
                    ErrorKind::MissingCredential => error!("Gateway call without credential"),
                    ErrorKind::SafetyBlock | ErrorKind::InvalidInput => info!("{}", err),
                    _ => warn!("Gateway failure: {}", err),
                }
                (
                    status_for_kind(kind),
                    ErrorBody {
                        kind: kind_name(kind),
                        message: kind.user_message(operation).to_string(),
                    },
                )
            }
            ScalpscanError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        kind: "internal",
                        message: "Internal server error".to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
