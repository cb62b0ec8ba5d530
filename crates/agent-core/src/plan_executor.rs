//! Drives one plan against a browser session.
//!
//! Steps run strictly in order. Each one is either a direct navigation or a
//! generated action script, followed by a settle delay, capture draining and
//! UI analysis. An empty plan falls back to a search when the goal asks for
//! one. Fatal browser errors end the loop and produce a recovery plan.

use std::sync::Arc;

use api_capture::ApiCapturePipeline;
use memory_center::SemanticMemoryStore;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;
use webnav_core_types::{
    excerpt, parse_plan, AttemptOutcome, EventObserver, Goal, NavigatorEvent, PlanStep, RunLedger,
    StepKind,
};

use crate::action::BrowserAction;
use crate::browser::{BrowserError, BrowserSession};
use crate::config::NavigatorConfig;
use crate::planner::TaskPlanner;
use crate::recovery::ErrorRecoveryPlanner;
use crate::report::PlanRunReport;
use crate::step_runner::StepCodeRunner;

/// Navigation when the step mentions any of `keywords`, case-insensitively.
pub fn classify_step<S: AsRef<str>>(text: &str, keywords: &[S]) -> StepKind {
    let lowered = text.to_lowercase();
    if keywords
        .iter()
        .any(|k| lowered.contains(&k.as_ref().to_lowercase()))
    {
        StepKind::Navigation
    } else {
        StepKind::Action
    }
}

/// First whitespace-delimited token that looks like a URL, punctuation trimmed.
///
/// Tokens starting with `www.` get an `https://` scheme.
pub fn extract_url(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|token| {
        let cleaned = token
            .trim_start_matches(|c| matches!(c, '(' | '<' | '[' | '"' | '\''))
            .trim_end_matches(|c| {
                matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | '>' | ']' | '"' | '\'')
            });
        if !(cleaned.starts_with("http") || cleaned.contains("www.")) {
            return None;
        }
        let candidate = if cleaned.starts_with("www.") {
            format!("https://{cleaned}")
        } else {
            cleaned.to_string()
        };
        let parsed = Url::parse(&candidate).ok()?;
        matches!(parsed.scheme(), "http" | "https").then_some(candidate)
    })
}

/// Search term for goals that mention a trigger: the lowercased goal with all
/// triggers removed, trimmed.
pub fn derive_search_term<S: AsRef<str>>(goal: &Goal, triggers: &[S]) -> Option<String> {
    if !goal.mentions_any(triggers) {
        return None;
    }
    let mut lowered = goal.as_str().to_lowercase();
    for trigger in triggers {
        lowered = lowered.replace(&trigger.as_ref().to_lowercase(), "");
    }
    Some(lowered.trim().to_string())
}

pub struct PlanExecutor {
    planner: Arc<TaskPlanner>,
    runner: StepCodeRunner,
    recovery: ErrorRecoveryPlanner,
    memory: Arc<SemanticMemoryStore>,
    capture: Arc<ApiCapturePipeline>,
    observer: Arc<dyn EventObserver>,
    config: NavigatorConfig,
}

impl PlanExecutor {
    pub fn new(
        planner: Arc<TaskPlanner>,
        runner: StepCodeRunner,
        recovery: ErrorRecoveryPlanner,
        memory: Arc<SemanticMemoryStore>,
        capture: Arc<ApiCapturePipeline>,
        observer: Arc<dyn EventObserver>,
        config: NavigatorConfig,
    ) -> Self {
        Self {
            planner,
            runner,
            recovery,
            memory,
            capture,
            observer,
            config,
        }
    }

    /// Execute `plan` for `goal`. Never fails: errors end up in the report.
    pub async fn run(
        &self,
        goal: &Goal,
        plan: &str,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
    ) -> PlanRunReport {
        let steps = parse_plan(plan);
        let mut report = PlanRunReport {
            steps: steps.len(),
            ..PlanRunReport::default()
        };
        self.observer
            .on_event(&NavigatorEvent::PlanReady { steps: steps.len() });

        let outcome = if steps.is_empty() {
            self.run_default(goal, session, ledger, &mut report).await
        } else {
            self.run_steps(&steps, session, ledger, &mut report).await
        };

        if let Err(err) = outcome {
            self.recover(goal, &err, session, ledger, &mut report).await;
        }
        report
    }

    async fn run_default(
        &self,
        goal: &Goal,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) -> Result<(), BrowserError> {
        match derive_search_term(goal, &self.config.search_triggers) {
            Some(term) => {
                info!(term = %term, "no plan steps; running default search");
                self.default_search(term, session, ledger, report).await
            }
            None => {
                info!(goal = %goal, "no plan steps and no search intent");
                Ok(())
            }
        }
    }

    async fn run_steps(
        &self,
        steps: &[PlanStep],
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) -> Result<(), BrowserError> {
        for step in steps {
            ledger.history.record(format!("PLAN STEP: {}", step.text));
            let url = match classify_step(&step.text, &self.config.navigation_keywords) {
                StepKind::Navigation => extract_url(&step.text),
                StepKind::Action => None,
            };
            let kind = if url.is_some() {
                StepKind::Navigation
            } else {
                StepKind::Action
            };
            debug!(step = step.index, ?kind, text = %step.text, "executing step");
            self.observer.on_event(&NavigatorEvent::StepStarted {
                index: step.index,
                text: step.text.clone(),
                kind,
            });

            let outcome = match url {
                Some(url) => {
                    if self.navigate(&url, session, ledger, report).await? {
                        AttemptOutcome::Success
                    } else {
                        AttemptOutcome::Failed
                    }
                }
                None => {
                    let attempt = self
                        .runner
                        .run(&step.text, session, &mut ledger.history)
                        .await?;
                    if let Some(error) = &attempt.error {
                        report
                            .errors
                            .push(format!("step {}: {}", step.index + 1, error));
                    }
                    let outcome = attempt.outcome;
                    report.attempts.push(attempt);
                    outcome
                }
            };
            self.observer.on_event(&NavigatorEvent::StepFinished {
                index: step.index,
                outcome,
            });

            self.settle().await;
            self.drain_captures(session, ledger, report).await;
            self.index_ui_analysis(&step.text, session, ledger).await;
        }
        Ok(())
    }

    /// Returns whether navigation succeeded; only fatal errors are `Err`.
    async fn navigate(
        &self,
        url: &str,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) -> Result<bool, BrowserError> {
        match session.navigate(url).await {
            Ok(()) => {
                let current = session.current_url();
                let landed = if current.is_empty() {
                    url.to_string()
                } else {
                    current
                };
                ledger
                    .history
                    .record(format!("NAVIGATION: Went to {landed}"));
                self.observer.on_event(&NavigatorEvent::Navigated {
                    url: landed.clone(),
                });
                self.index_page_visit(&landed, session).await;
                Ok(true)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(url, error = %err, "navigation failed");
                ledger.history.record(format!("NAVIGATION ERROR: {err}"));
                self.observer.on_event(&NavigatorEvent::NavigationFailed {
                    url: url.to_string(),
                    error: err.to_string(),
                });
                report.errors.push(err.to_string());
                Ok(false)
            }
        }
    }

    async fn default_search(
        &self,
        term: String,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) -> Result<(), BrowserError> {
        report.fallback_search = Some(term.clone());
        self.observer
            .on_event(&NavigatorEvent::FallbackSearch { term: term.clone() });

        let engine = self.config.search_engine_url.clone();
        if !self.navigate(&engine, session, ledger, report).await? {
            return Ok(());
        }

        let action = BrowserAction::TypeText {
            selector: format!("[name=\"{}\"]", self.config.search_field),
            text: term.clone(),
            submit: true,
        };
        match session.run_action(&action).await {
            Ok(()) => {
                ledger.history.record(format!(
                    "DEFAULT: Searched for '{term}' on {}",
                    engine_host(&engine)
                ));
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(term = %term, error = %err, "default search failed");
                ledger
                    .history
                    .record(format!("DEFAULT: Search for '{term}' failed: {err}"));
                report.errors.push(err.to_string());
                Ok(())
            }
        }
    }

    async fn recover(
        &self,
        goal: &Goal,
        error: &BrowserError,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) {
        warn!(goal = %goal, error = %error, "step loop aborted; planning recovery");
        self.plan_recovery(goal, &error.to_string(), ledger, report).await;

        // Best effort: the session may be unusable by now.
        if let Some(term) = derive_search_term(goal, &self.config.search_triggers) {
            if let Err(err) = self.default_search(term.clone(), session, ledger, report).await {
                ledger
                    .history
                    .record(format!("DEFAULT: Search for '{term}' failed: {err}"));
                report.errors.push(err.to_string());
            }
        }
    }

    /// Recovery for a run whose browser session never opened. The search
    /// fallback needs a session, so it is recorded as skipped.
    pub async fn recover_without_session(
        &self,
        goal: &Goal,
        plan: &str,
        error: &BrowserError,
        ledger: &mut RunLedger,
    ) -> PlanRunReport {
        let mut report = PlanRunReport {
            steps: parse_plan(plan).len(),
            ..PlanRunReport::default()
        };
        let context = format!("failed to open browser session: {error}");
        warn!(goal = %goal, error = %error, "no browser session; planning recovery");
        self.plan_recovery(goal, &context, ledger, &mut report).await;

        if let Some(term) = derive_search_term(goal, &self.config.search_triggers) {
            ledger.history.record(format!(
                "DEFAULT: Search for '{term}' skipped: no browser session"
            ));
        }
        report
    }

    async fn plan_recovery(
        &self,
        goal: &Goal,
        error: &str,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) {
        let plan = self
            .recovery
            .plan(error, goal.as_str(), ledger.history.entries())
            .await;
        let first_line = plan
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        ledger.history.record(format!("RECOVERY: {first_line}"));
        self.observer.on_event(&NavigatorEvent::RecoveryPlanned {
            error: error.to_string(),
            plan: plan.clone(),
        });
        report.errors.push(error.to_string());
        report.recovery_plan = Some(plan);
    }

    async fn settle(&self) {
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn drain_captures(
        &self,
        session: &mut dyn BrowserSession,
        ledger: &mut RunLedger,
        report: &mut PlanRunReport,
    ) {
        for (request, response) in session.drain_captured() {
            let capture = self.capture.process(ledger, request, response).await;
            report.captures.push(capture);
        }
    }

    async fn index_page_visit(&self, url: &str, session: &mut dyn BrowserSession) {
        let text = format!(
            "URL: {url}\nTitle: {}\nContent: {}",
            session.title(),
            excerpt(&session.page_source(), self.config.page_excerpt_chars)
        );
        self.index(
            &format!("page_{url}"),
            &text,
            json!({"type": "webpage_visit", "url": url}),
        )
        .await;
    }

    async fn index_ui_analysis(
        &self,
        step: &str,
        session: &mut dyn BrowserSession,
        ledger: &RunLedger,
    ) {
        let page = session.page_source();
        if page.is_empty() {
            return;
        }
        let url = session.current_url();
        let analysis = self.planner.analyze_ui(&page, &url).await;
        self.index(
            &ledger.memory_id("ui_analysis"),
            &analysis.full_analysis,
            json!({"type": "ui_analysis", "url": url, "step": step}),
        )
        .await;
    }

    async fn index(&self, id: &str, text: &str, metadata: serde_json::Value) {
        let kind = metadata["type"].as_str().unwrap_or_default().to_string();
        if self.memory.add(id, text, metadata).await {
            self.observer.on_event(&NavigatorEvent::MemoryIndexed {
                id: id.to_string(),
                kind,
            });
        } else {
            debug!(id, kind = %kind, "memory item not stored");
        }
    }
}

fn engine_host(engine: &str) -> String {
    Url::parse(engine)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| engine.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV: [&str; 3] = ["navigate", "go to", "open"];
    const TRIGGERS: [&str; 5] = ["search", "find", "look up", "google", "check"];

    #[test]
    fn navigation_step_extracts_url_without_punctuation() {
        let step = "Navigate to http://example.com now";
        assert_eq!(classify_step(step, &NAV), StepKind::Navigation);
        assert_eq!(extract_url(step).as_deref(), Some("http://example.com"));
        assert_eq!(
            extract_url("Open https://example.com/path.").as_deref(),
            Some("https://example.com/path")
        );
    }

    #[test]
    fn www_tokens_get_a_scheme() {
        assert_eq!(
            extract_url("Go to (www.example.org),").as_deref(),
            Some("https://www.example.org")
        );
    }

    #[test]
    fn steps_without_keywords_are_actions() {
        assert_eq!(classify_step("Click the login button", &NAV), StepKind::Action);
        assert_eq!(classify_step("OPEN the menu", &NAV), StepKind::Navigation);
        assert_eq!(extract_url("Open the settings menu"), None);
        assert_eq!(extract_url("Navigate to http:"), None);
    }

    #[test]
    fn search_term_strips_triggers() {
        let term = derive_search_term(&Goal::new("search for cats"), &TRIGGERS);
        assert_eq!(term.as_deref(), Some("for cats"));
        let term = derive_search_term(&Goal::new("Look up  the  Weather"), &TRIGGERS);
        assert_eq!(term.as_deref(), Some("the  weather"));
        assert_eq!(derive_search_term(&Goal::new("book a flight"), &TRIGGERS), None);
    }

    #[test]
    fn engine_host_from_url() {
        assert_eq!(engine_host("https://www.google.com"), "www.google.com");
        assert_eq!(engine_host("not a url"), "not a url");
    }
}
