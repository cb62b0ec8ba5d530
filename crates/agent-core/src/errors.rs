use api_capture::CaptureError;
use thiserror::Error;

use crate::browser::BrowserError;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when a request is malformed or missing required fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Only one goal may run per navigator at a time.
    #[error("a goal is already in flight")]
    GoalInFlight,

    /// Raised when a generated action script cannot be understood.
    #[error("failed to parse action script: {0}")]
    ActionParse(String),
}

impl AgentError {
    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Helper for action script failures.
    pub fn action_parse(message: impl Into<String>) -> Self {
        Self::ActionParse(message.into())
    }
}
