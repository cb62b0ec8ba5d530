//! Goals and the line-structured plans derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Natural-language objective driving one orchestration run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Goal(String);

impl Goal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive check for any of `terms` appearing in the goal.
    pub fn mentions_any<S: AsRef<str>>(&self, terms: &[S]) -> bool {
        let lowered = self.0.to_lowercase();
        terms
            .iter()
            .any(|term| lowered.contains(&term.as_ref().to_lowercase()))
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Goal {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Goal {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One planned unit of work: a non-empty trimmed line of the plan.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub index: usize,
    pub text: String,
}

/// How a plan step is carried out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Direct navigation to a URL named in the step.
    Navigation,
    /// Generated action script run through the step runner.
    Action,
}

/// Outcome of executing one step's generated action script.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// The first execution failed and the fixed script succeeded.
    FixedSuccess,
    Failed,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, AttemptOutcome::Failed)
    }
}

/// Split plan text into steps: lines are trimmed, blank lines dropped, order kept.
pub fn parse_plan(plan: &str) -> Vec<PlanStep> {
    plan.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| PlanStep {
            index,
            text: text.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_blank_lines_and_trims() {
        let steps = parse_plan("  \nStep 1\n\nStep 2  \n");
        let texts: Vec<&str> = steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Step 1", "Step 2"]);
        assert_eq!(steps[1].index, 1);
    }

    #[test]
    fn parse_of_whitespace_only_plan_is_empty() {
        assert!(parse_plan(" \n\t\n").is_empty());
        assert!(parse_plan("").is_empty());
    }

    #[test]
    fn parse_handles_crlf() {
        let steps = parse_plan("a\r\nb\r\n");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].text, "a");
    }

    #[test]
    fn goal_term_matching_is_case_insensitive() {
        let goal = Goal::new("Please GOOGLE the weather");
        assert!(goal.mentions_any(&["google"]));
        assert!(!goal.mentions_any(&["find", "check"]));
    }
}
