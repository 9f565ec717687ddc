//! Per-session flow: which gateway call may run, and what the UI should show.
//!
//! ```text
//! Idle -> Analyzing -> Results | Error
//! Results | PreviewReady -> GeneratingPreview -> PreviewReady | Results (with preview error)
//! ```
//!
//! At most one call is in flight per session. In-flight states carry their start
//! time so an abandoned call (client went away) doesn't wedge the session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assessment::AssessmentResult;
use crate::gateway::ErrorKind;

/// Where a session is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FlowState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Analysis in flight.
    Analyzing {
        /// Unix seconds when the call started.
        started_at: i64,
    },
    /// Analysis done; a preview may be requested.
    Results {
        /// The assessment.
        assessment: AssessmentResult,
        /// Set when the last preview attempt failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preview_error: Option<ErrorKind>,
    },
    /// Analysis failed.
    Error {
        /// What went wrong.
        kind: ErrorKind,
    },
    /// Preview generation in flight.
    GeneratingPreview {
        /// Assessment the preview belongs to.
        assessment: AssessmentResult,
        /// Unix seconds when the call started.
        started_at: i64,
    },
    /// Preview returned; may be regenerated.
    PreviewReady {
        /// Assessment the preview belongs to.
        assessment: AssessmentResult,
    },
}

/// Rejected transition.
#[derive(Debug, PartialEq, Eq)]
pub enum FlowError {
    /// A gateway call is already running for this session.
    Busy,
    /// The event doesn't apply to the current state.
    InvalidTransition {
        /// state name
        from: &'static str,
        /// event name
        event: &'static str,
    },
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "A request is already in progress for this session"),
            Self::InvalidTransition { from, event } => {
                write!(f, "Cannot {event} while {from}")
            }
        }
    }
}

impl std::error::Error for FlowError {}

impl FlowState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing { .. } => "analyzing",
            Self::Results { .. } => "results",
            Self::Error { .. } => "error",
            Self::GeneratingPreview { .. } => "generating_preview",
            Self::PreviewReady { .. } => "preview_ready",
        }
    }

    /// True while a gateway call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Analyzing { .. } | Self::GeneratingPreview { .. }
        )
    }

    /// Drops an in-flight state that started more than `stale_after` seconds before `now`.
    pub fn settle(self, now: i64, stale_after: i64) -> Self {
        match self {
            Self::Analyzing { started_at } if now - started_at > stale_after => {
                debug!("Abandoning stale analysis started at {}", started_at);
                Self::Idle
            }
            Self::GeneratingPreview {
                assessment,
                started_at,
            } if now - started_at > stale_after => {
                debug!("Abandoning stale preview started at {}", started_at);
                Self::Results {
                    assessment,
                    preview_error: None,
                }
            }
            other => other,
        }
    }

    fn invalid(&self, event: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            from: self.name(),
            event,
        }
    }

    /// Starts an analysis; allowed from any settled state.
    pub fn begin_analysis(&mut self, now: i64) -> Result<(), FlowError> {
        if self.is_in_flight() {
            return Err(FlowError::Busy);
        }
        *self = Self::Analyzing { started_at: now };
        Ok(())
    }

    /// Analysis succeeded.
    pub fn finish_analysis(&mut self, assessment: AssessmentResult) -> Result<(), FlowError> {
        match self {
            Self::Analyzing { .. } => {
                *self = Self::Results {
                    assessment,
                    preview_error: None,
                };
                Ok(())
            }
            other => Err(other.invalid("finish analysis")),
        }
    }

    /// Analysis failed.
    pub fn fail_analysis(&mut self, kind: ErrorKind) -> Result<(), FlowError> {
        match self {
            Self::Analyzing { .. } => {
                *self = Self::Error { kind };
                Ok(())
            }
            other => Err(other.invalid("fail analysis")),
        }
    }

    /// Starts a preview; needs a finished assessment.
    pub fn begin_preview(&mut self, now: i64) -> Result<(), FlowError> {
        let assessment = match self {
            Self::Analyzing { .. } | Self::GeneratingPreview { .. } => {
                return Err(FlowError::Busy);
            }
            Self::Results { assessment, .. } | Self::PreviewReady { assessment } => {
                assessment.clone()
            }
            other => return Err(other.invalid("generate a preview")),
        };
        *self = Self::GeneratingPreview {
            assessment,
            started_at: now,
        };
        Ok(())
    }

    /// Preview succeeded.
    pub fn finish_preview(&mut self) -> Result<(), FlowError> {
        match self {
            Self::GeneratingPreview { assessment, .. } => {
                *self = Self::PreviewReady {
                    assessment: assessment.clone(),
                };
                Ok(())
            }
            other => Err(other.invalid("finish preview")),
        }
    }

    /// Preview failed; back to results with the error attached.
    pub fn fail_preview(&mut self, kind: ErrorKind) -> Result<(), FlowError> {
        match self {
            Self::GeneratingPreview { assessment, .. } => {
                *self = Self::Results {
                    assessment: assessment.clone(),
                    preview_error: Some(kind),
                };
                Ok(())
            }
            other => Err(other.invalid("fail preview")),
        }
    }

    /// Back to the start, whatever is happening.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}
