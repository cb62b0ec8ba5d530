//! Top-level goal sequencing: plan, execute, summarize, tear down.

use std::sync::Arc;

use api_capture::API_REQUEST_KIND;
use memory_center::SemanticMemoryStore;
use serde_json::json;
use tracing::{debug, info, warn};
use webnav_core_types::{
    excerpt, EventObserver, Goal, GoalStatus, NavigatorEvent, RunId, RunLedger,
};

use crate::browser::{BrowserDriver, BrowserError, BrowserSession};
use crate::config::NavigatorConfig;
use crate::plan_executor::PlanExecutor;
use crate::planner::TaskPlanner;
use crate::report::GoalReport;

const INITIAL_CONTEXT: &str = "Starting a new browsing session.";

/// Owns a browser session and closes it exactly once.
///
/// Call [`SessionGuard::release`] on the normal path. If the guard is dropped
/// while still holding the session (early return or panic), the close is
/// spawned onto the current runtime instead.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    observer: Arc<dyn EventObserver>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>, observer: Arc<dyn EventObserver>) -> Self {
        Self {
            session: Some(session),
            observer,
        }
    }

    pub fn session_mut(&mut self) -> Result<&mut dyn BrowserSession, BrowserError> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(BrowserError::SessionLost(
                "session already released".to_string(),
            )),
        }
    }

    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close().await {
                warn!(error = %err, "closing browser session failed");
            }
            self.observer.on_event(&NavigatorEvent::SessionClosed);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = session.close().await {
                    warn!(error = %err, "closing abandoned browser session failed");
                }
            });
        } else {
            debug!("no tokio runtime available to close browser session");
        }
        self.observer.on_event(&NavigatorEvent::SessionClosed);
    }
}

pub struct GoalOrchestrator {
    planner: Arc<TaskPlanner>,
    executor: PlanExecutor,
    driver: Arc<dyn BrowserDriver>,
    memory: Arc<SemanticMemoryStore>,
    observer: Arc<dyn EventObserver>,
    config: NavigatorConfig,
    summary_text_chars: usize,
}

impl GoalOrchestrator {
    pub fn new(
        planner: Arc<TaskPlanner>,
        executor: PlanExecutor,
        driver: Arc<dyn BrowserDriver>,
        memory: Arc<SemanticMemoryStore>,
        observer: Arc<dyn EventObserver>,
        config: NavigatorConfig,
        summary_text_chars: usize,
    ) -> Self {
        Self {
            planner,
            executor,
            driver,
            memory,
            observer,
            config,
            summary_text_chars,
        }
    }

    /// Pursue `goal` end to end. Failures are folded into the report; the
    /// browser session is closed on every path.
    pub async fn perform(&self, goal: Goal) -> GoalReport {
        let run_id = RunId::new();
        info!(run_id = %run_id, goal = %goal, "goal started");
        self.observer.on_event(&NavigatorEvent::GoalStarted {
            run_id: run_id.to_string(),
            goal: goal.to_string(),
        });

        let mut ledger = RunLedger::for_run(run_id.clone());
        let initial_plan = self.planner.plan(goal.as_str(), INITIAL_CONTEXT).await;
        self.index_plan(&goal, &initial_plan, &ledger).await;

        let run = match self.driver.create_session(self.config.headless).await {
            Ok(session) => {
                let mut guard = SessionGuard::new(session, Arc::clone(&self.observer));
                let run = match guard.session_mut() {
                    Ok(session) => {
                        self.executor
                            .run(&goal, &initial_plan, session, &mut ledger)
                            .await
                    }
                    Err(err) => {
                        self.executor
                            .recover_without_session(&goal, &initial_plan, &err, &mut ledger)
                            .await
                    }
                };
                guard.release().await;
                run
            }
            Err(err) => {
                warn!(error = %err, "could not open browser session");
                self.executor
                    .recover_without_session(&goal, &initial_plan, &err, &mut ledger)
                    .await
            }
        };

        let summary = self.summarize(&goal).await;
        self.observer.on_event(&NavigatorEvent::SummaryReady {
            summary: summary.clone(),
        });

        let status = if run.has_errors() {
            GoalStatus::CompletedWithErrors
        } else {
            GoalStatus::Completed
        };
        info!(run_id = %run_id, ?status, steps = run.steps, "goal finished");
        self.observer.on_event(&NavigatorEvent::GoalFinished {
            run_id: run_id.to_string(),
            status,
        });

        GoalReport {
            run_id: run_id.to_string(),
            goal: goal.to_string(),
            initial_plan,
            run,
            summary,
            status,
        }
    }

    async fn index_plan(&self, goal: &Goal, plan: &str, ledger: &RunLedger) {
        let id = ledger.memory_id("plan");
        let added = self
            .memory
            .add(
                &id,
                &format!("Plan for goal: {goal}\n{plan}"),
                json!({"type": "plan", "goal": goal.as_str()}),
            )
            .await;
        if added {
            self.observer.on_event(&NavigatorEvent::MemoryIndexed {
                id,
                kind: "plan".to_string(),
            });
        }
    }

    async fn summarize(&self, goal: &Goal) -> String {
        let snippets: Vec<String> = self
            .memory
            .search(goal.as_str(), self.config.summary_top_k)
            .await
            .into_iter()
            .filter(|scored| scored.item.kind() == Some(API_REQUEST_KIND))
            .map(|scored| excerpt(&scored.item.text, self.summary_text_chars).to_string())
            .collect();
        self.planner.summarize(goal.as_str(), &snippets).await
    }
}
