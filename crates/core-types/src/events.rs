//! Structured progress events.
//!
//! The orchestration core never prints; it reports progress through an
//! [`EventObserver`] and front ends decide how to render it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::plan::{AttemptOutcome, StepKind};

/// Final status of one goal run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Completed,
    CompletedWithErrors,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavigatorEvent {
    GoalStarted {
        run_id: String,
        goal: String,
    },
    PlanReady {
        steps: usize,
    },
    StepStarted {
        index: usize,
        text: String,
        kind: StepKind,
    },
    StepFinished {
        index: usize,
        outcome: AttemptOutcome,
    },
    Navigated {
        url: String,
    },
    NavigationFailed {
        url: String,
        error: String,
    },
    FallbackSearch {
        term: String,
    },
    ApiCaptured {
        method: String,
        url: String,
    },
    MemoryIndexed {
        id: String,
        kind: String,
    },
    RecoveryPlanned {
        error: String,
        plan: String,
    },
    SummaryReady {
        summary: String,
    },
    SessionClosed,
    GoalFinished {
        run_id: String,
        status: GoalStatus,
    },
}

impl NavigatorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NavigatorEvent::GoalStarted { .. } => "goal_started",
            NavigatorEvent::PlanReady { .. } => "plan_ready",
            NavigatorEvent::StepStarted { .. } => "step_started",
            NavigatorEvent::StepFinished { .. } => "step_finished",
            NavigatorEvent::Navigated { .. } => "navigated",
            NavigatorEvent::NavigationFailed { .. } => "navigation_failed",
            NavigatorEvent::FallbackSearch { .. } => "fallback_search",
            NavigatorEvent::ApiCaptured { .. } => "api_captured",
            NavigatorEvent::MemoryIndexed { .. } => "memory_indexed",
            NavigatorEvent::RecoveryPlanned { .. } => "recovery_planned",
            NavigatorEvent::SummaryReady { .. } => "summary_ready",
            NavigatorEvent::SessionClosed => "session_closed",
            NavigatorEvent::GoalFinished { .. } => "goal_finished",
        }
    }
}

/// Receiver of progress events. Implementations must not block.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &NavigatorEvent);
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn on_event(&self, _event: &NavigatorEvent) {}
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<NavigatorEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<NavigatorEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl EventObserver for RecordingObserver {
    fn on_event(&self, event: &NavigatorEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_counts_by_name() {
        let observer = RecordingObserver::new();
        observer.on_event(&NavigatorEvent::PlanReady { steps: 2 });
        observer.on_event(&NavigatorEvent::SessionClosed);
        observer.on_event(&NavigatorEvent::SessionClosed);
        assert_eq!(observer.count("session_closed"), 2);
        assert_eq!(observer.count("plan_ready"), 1);
        assert_eq!(observer.events().len(), 3);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(NavigatorEvent::Navigated {
            url: "https://example.com".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "navigated");
    }
}
