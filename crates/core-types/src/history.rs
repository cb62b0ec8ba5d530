//! Append-only record of what happened during one run.

use serde::{Deserialize, Serialize};

use crate::capture::CapturedRequest;
use crate::RunId;

/// Ordered, append-only log of human-readable events.
///
/// The sole source of "what happened" for recovery planning and debugging.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionHistory {
    entries: Vec<String>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!(entry = %entry, "history");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that start with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.entries.iter().filter(move |e| e.starts_with(prefix))
    }
}

/// Run-scoped mutable state shared by the executor and the capture pipeline.
#[derive(Clone, Debug, Default)]
pub struct RunLedger {
    pub run_id: RunId,
    pub history: ActionHistory,
    pub captured_requests: Vec<CapturedRequest>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_run(run_id: RunId) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// `<prefix>_<run id>_<history length>`: unique across runs that share
    /// one memory store.
    pub fn memory_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}", self.run_id, self.history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_tail_in_order() {
        let mut history = ActionHistory::new();
        for i in 0..7 {
            history.record(format!("e{i}"));
        }
        assert_eq!(history.recent(5), &["e2", "e3", "e4", "e5", "e6"]);
        assert_eq!(history.recent(50).len(), 7);
        assert!(ActionHistory::new().recent(5).is_empty());
    }

    #[test]
    fn prefix_filter() {
        let mut history = ActionHistory::new();
        history.record("NAVIGATION: Went to a");
        history.record("PLAN STEP: x");
        history.record("NAVIGATION: Went to b");
        assert_eq!(history.with_prefix("NAVIGATION:").count(), 2);
    }

    #[test]
    fn memory_ids_differ_between_runs() {
        let mut first = RunLedger::for_run(RunId("a".into()));
        let second = RunLedger::for_run(RunId("b".into()));
        assert_eq!(first.memory_id("plan"), "plan_a_0");
        assert_ne!(first.memory_id("plan"), second.memory_id("plan"));

        first.history.record("PLAN STEP: x");
        assert_eq!(first.memory_id("ui_analysis"), "ui_analysis_a_1");
    }
}
