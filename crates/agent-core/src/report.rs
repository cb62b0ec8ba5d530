//! Results handed back to callers after a run.

use api_capture::CaptureReport;
use serde::{Deserialize, Serialize};
use webnav_core_types::{AttemptOutcome, GoalStatus};

/// Result of executing one step's generated action script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAttempt {
    pub step: String,
    pub generated_code: String,
    pub fixed_code: Option<String>,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    /// Scripts executed for this step: one, or two after a fix.
    pub executions: u8,
}

impl ActionAttempt {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRunReport {
    pub steps: usize,
    pub attempts: Vec<ActionAttempt>,
    pub captures: Vec<CaptureReport>,
    /// Search term used by the default search, when it ran.
    pub fallback_search: Option<String>,
    pub recovery_plan: Option<String>,
    pub errors: Vec<String>,
}

impl PlanRunReport {
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.is_success()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.recovery_plan.is_some() || !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalReport {
    pub run_id: String,
    pub goal: String,
    pub initial_plan: String,
    pub run: PlanRunReport,
    pub summary: String,
    pub status: GoalStatus,
}
