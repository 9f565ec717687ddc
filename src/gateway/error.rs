//! Gateway failure taxonomy.

use serde::{Deserialize, Serialize};

/// Stable, serializable name for a gateway failure, safe to show callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No API key configured
    MissingCredential,
    /// Rate limit or quota exhausted, retries used up
    QuotaExceeded,
    /// The provider refused the content
    SafetyBlock,
    /// Structured response missing or malformed
    ParseError,
    /// Generation finished without an image
    NoImageReturned,
    /// Generation stopped for a non-safety reason
    GenerationStopped,
    /// Caller sent nothing usable
    InvalidInput,
    /// Any other upstream status
    Upstream,
    /// Network / transport failure
    Transport,
}

/// Which gateway call a failure came from; picks the user-facing wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// [super::GatewayClient::analyze]
    Analysis,
    /// [super::GatewayClient::generate]
    Preview,
}

impl ErrorKind {
    /// Fixed user-facing message for this kind, worded for the failed operation.
    pub fn user_message(self, operation: Operation) -> &'static str {
        match (self, operation) {
            (Self::MissingCredential, _) => {
                "The assessment service is not configured. Please contact the site operator."
            }
            (Self::SafetyBlock, _) => {
                "This photo could not be processed. Please try a different photo of your scalp."
            }
            (Self::InvalidInput, Operation::Analysis) => "Please provide a photo of your scalp.",
            (Self::InvalidInput, Operation::Preview) => {
                "Please provide a photo and a style description."
            }
            (Self::NoImageReturned | Self::GenerationStopped, _) | (_, Operation::Preview) => {
                "The preview could not be generated. Please try again later."
            }
            (_, Operation::Analysis) => "The analysis could not be completed. Please try again later.",
        }
    }
}

/// Classified failure from [super::GatewayClient].
#[derive(Debug)]
pub enum GatewayError {
    /// No API key configured.
    MissingCredential,
    /// Quota/rate limit signalled by upstream.
    QuotaExceeded(String),
    /// Content moderation stopped the request; carries the provider reason.
    SafetyBlock(String),
    /// Response missing or not the expected JSON.
    ParseError(String),
    /// Finished normally but no inline image came back.
    NoImageReturned,
    /// Finished for another reason without an image.
    GenerationStopped(String),
    /// Empty image or style prompt.
    InvalidInput(String),
    /// Non-success status that isn't a quota error.
    Upstream {
        /// HTTP status
        status: u16,
        /// Upstream error message, for logs only
        message: String,
    },
    /// The request never completed.
    Transport(reqwest::Error),
}

impl GatewayError {
    /// The serializable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential => ErrorKind::MissingCredential,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::SafetyBlock(_) => ErrorKind::SafetyBlock,
            Self::ParseError(_) => ErrorKind::ParseError,
            Self::NoImageReturned => ErrorKind::NoImageReturned,
            Self::GenerationStopped(_) => ErrorKind::GenerationStopped,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Only quota errors are transient enough to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "No API key configured"),
            Self::QuotaExceeded(message) => write!(f, "Quota exceeded: {message}"),
            Self::SafetyBlock(reason) => write!(f, "Blocked by content safety: {reason}"),
            Self::ParseError(message) => write!(f, "Failed to parse model response: {message}"),
            Self::NoImageReturned => write!(f, "Model finished without returning an image"),
            Self::GenerationStopped(reason) => write!(f, "Generation stopped: {reason}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            Self::Upstream { status, message } => {
                write!(f, "Upstream error {status}: {message}")
            }
            Self::Transport(err) => write!(f, "Request failed: {err}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err)
    }
}

impl From<crate::assessment::AssessmentError> for GatewayError {
    fn from(err: crate::assessment::AssessmentError) -> Self {
        GatewayError::ParseError(err.to_string())
    }
}
