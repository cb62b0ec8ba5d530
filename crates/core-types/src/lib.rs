//! Shared primitives for the webnav goal-execution engine.
//!
//! Every other crate in the workspace speaks in these types: the model
//! service contract, plan steps, the per-run action history and the
//! progress events emitted while a goal is pursued.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod capture;
pub mod events;
pub mod history;
pub mod mock;
pub mod model;
pub mod plan;

pub use capture::{CapturedRequest, CapturedResponse};
pub use events::{EventObserver, GoalStatus, NavigatorEvent, NoopObserver, RecordingObserver};
pub use history::{ActionHistory, RunLedger};
pub use mock::MockLanguageModel;
pub use model::{LanguageModel, ModelResponse, TaskKind};
pub use plan::{parse_plan, AttemptOutcome, Goal, PlanStep, StepKind};

/// Shared error type for the webnav crates.
#[derive(Debug, Error, Clone)]
pub enum NavError {
    #[error("{message}")]
    Message { message: String },
}

impl NavError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifier of one orchestration run.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncate `text` to at most `max_chars` characters, respecting char boundaries.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`excerpt`] but appends `...` when the text was cut.
pub fn excerpt_with_ellipsis(text: &str, max_chars: usize) -> String {
    let cut = excerpt(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("abc", 10), "abc");
        assert_eq!(excerpt("", 3), "");
    }

    #[test]
    fn ellipsis_only_when_truncated() {
        assert_eq!(excerpt_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(excerpt_with_ellipsis("abc", 3), "abc");
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
