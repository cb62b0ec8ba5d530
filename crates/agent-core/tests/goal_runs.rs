mod common;

use std::sync::Arc;

use agent_core::{BrowserAction, BrowserError, Navigator, NavigatorConfig};
use common::ScriptedDriver;
use webnav_core_types::{
    AttemptOutcome, CapturedRequest, CapturedResponse, GoalStatus, MockLanguageModel,
    RecordingObserver, TaskKind,
};

fn navigator(
    model: &Arc<MockLanguageModel>,
    driver: &ScriptedDriver,
    observer: &Arc<RecordingObserver>,
) -> Navigator {
    Navigator::builder(model.clone(), Arc::new(driver.clone()))
        .observer(observer.clone())
        .config(NavigatorConfig::minimal())
        .build()
}

#[tokio::test]
async fn failed_fix_is_reported_and_next_step_still_runs() {
    let model = Arc::new(
        MockLanguageModel::new()
            .with_text(TaskKind::General, "Click the login button\nClick submit")
            .with_text(TaskKind::Coding, r##"[{"action":"click","selector":"#a"}]"##)
            .with_text(TaskKind::Coding, r##"[{"action":"click","selector":"#b"}]"##),
    );
    let driver = ScriptedDriver::new()
        .with_action_result(Err(BrowserError::ElementNotFound("#a".into())))
        .with_action_result(Err(BrowserError::action("E2")));
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("log into the site")
        .await
        .unwrap();

    let run = &report.run;
    assert_eq!(run.steps, 2);
    assert_eq!(run.attempts.len(), 2);

    let first = &run.attempts[0];
    assert_eq!(first.outcome, AttemptOutcome::Failed);
    assert_eq!(first.executions, 2);
    assert_eq!(first.error.as_deref(), Some("action failed: E2"));
    assert!(first.fixed_code.as_deref().unwrap().contains("#b"));

    assert_eq!(run.attempts[1].outcome, AttemptOutcome::Success);
    assert_eq!(run.attempts[1].executions, 1);

    // Two generations plus one fix; the fix saw the first error.
    assert_eq!(model.call_count(TaskKind::Coding), 3);
    assert!(model.prompts_for(TaskKind::Coding)[1].contains("element not found: #a"));
    assert_eq!(driver.actions().len(), 2);

    assert_eq!(run.errors, vec!["step 1: action failed: E2".to_string()]);
    assert_eq!(report.status, GoalStatus::CompletedWithErrors);
    assert_eq!(observer.count("step_finished"), 2);
}

#[tokio::test]
async fn fixed_script_counts_as_success() {
    let model = Arc::new(
        MockLanguageModel::new()
            .with_text(TaskKind::General, "Click the login button")
            .with_text(TaskKind::Coding, "not json at all")
            .with_text(TaskKind::Coding, r##"[{"action":"click","selector":"#login"}]"##),
    );
    let driver = ScriptedDriver::new();
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("log in")
        .await
        .unwrap();

    let attempt = &report.run.attempts[0];
    assert_eq!(attempt.outcome, AttemptOutcome::FixedSuccess);
    assert_eq!(attempt.executions, 2);
    assert!(attempt.error.is_none());
    assert_eq!(driver.actions().len(), 1);
    assert_eq!(report.status, GoalStatus::Completed);
}

#[tokio::test]
async fn empty_plan_falls_back_to_search() {
    let model = Arc::new(MockLanguageModel::new().with_text(TaskKind::General, ""));
    let driver = ScriptedDriver::new();
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("search for cats")
        .await
        .unwrap();

    assert_eq!(report.run.steps, 0);
    assert_eq!(report.run.fallback_search.as_deref(), Some("for cats"));
    assert_eq!(driver.navigations(), vec!["https://www.google.com".to_string()]);
    assert_eq!(
        driver.actions(),
        vec![BrowserAction::TypeText {
            selector: r#"[name="q"]"#.into(),
            text: "for cats".into(),
            submit: true,
        }]
    );
    assert_eq!(report.status, GoalStatus::Completed);
    assert_eq!(observer.count("fallback_search"), 1);
    assert_eq!(observer.count("navigated"), 1);
}

#[tokio::test]
async fn empty_plan_without_search_intent_does_nothing() {
    let model = Arc::new(MockLanguageModel::new().with_text(TaskKind::General, "  \n"));
    let driver = ScriptedDriver::new();
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("say hello")
        .await
        .unwrap();

    assert!(report.run.fallback_search.is_none());
    assert!(driver.navigations().is_empty());
    assert!(driver.actions().is_empty());
    assert_eq!(driver.closes(), 1);
}

#[tokio::test]
async fn navigation_step_visits_url_and_indexes_page() {
    let model = Arc::new(
        MockLanguageModel::new().with_text(TaskKind::General, "Navigate to https://example.com/docs."),
    );
    let driver = ScriptedDriver::new().with_page("<html><h1>Docs</h1></html>");
    let observer = RecordingObserver::new();
    let nav = navigator(&model, &driver, &observer);

    let report = nav.perform("read the docs").await.unwrap();

    assert_eq!(driver.navigations(), vec!["https://example.com/docs".to_string()]);
    assert!(report.run.attempts.is_empty());
    assert_eq!(model.call_count(TaskKind::Coding), 0);

    let memory = nav.memory();
    assert!(memory.contains(&format!("plan_{}_0", report.run_id)));
    assert!(memory.contains("page_https://example.com/docs"));
    // PLAN STEP and NAVIGATION entries precede the analysis.
    assert!(memory.contains(&format!("ui_analysis_{}_2", report.run_id)));
    assert_eq!(report.status, GoalStatus::Completed);
}

#[tokio::test]
async fn failed_navigation_is_recorded_and_run_continues() {
    let model = Arc::new(MockLanguageModel::new().with_text(
        TaskKind::General,
        "Open https://down.example.com\nClick the retry button",
    ));
    let driver = ScriptedDriver::new().with_navigation_error(
        "https://down.example.com",
        BrowserError::navigation("https://down.example.com", "timeout"),
    );
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("open the status page")
        .await
        .unwrap();

    assert_eq!(observer.count("navigation_failed"), 1);
    assert_eq!(report.run.attempts.len(), 1);
    assert_eq!(
        report.run.errors,
        vec!["navigation to https://down.example.com failed: timeout".to_string()]
    );
    assert_eq!(report.status, GoalStatus::CompletedWithErrors);
}

#[tokio::test]
async fn fatal_error_produces_recovery_plan_and_closes_session() {
    let model = Arc::new(
        MockLanguageModel::new()
            .with_text(TaskKind::General, "Click the button\nClick again")
            .with_text(TaskKind::General, "1. Reload the page\n2. Retry")
            .with_text(TaskKind::Coding, r##"[{"action":"click","selector":"#go"}]"##),
    );
    let driver =
        ScriptedDriver::new().with_action_result(Err(BrowserError::SessionLost("crashed".into())));
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("open the dashboard")
        .await
        .unwrap();

    assert_eq!(
        report.run.recovery_plan.as_deref(),
        Some("1. Reload the page\n2. Retry")
    );
    assert!(report.run.attempts.is_empty());
    assert_eq!(driver.actions().len(), 1);
    assert!(report
        .run
        .errors
        .contains(&"browser session lost: crashed".to_string()));
    assert_eq!(report.status, GoalStatus::CompletedWithErrors);

    let recovery_prompt = &model.prompts_for(TaskKind::General)[1];
    assert!(recovery_prompt.contains("ORIGINAL GOAL: open the dashboard"));
    assert!(recovery_prompt.contains("1. PLAN STEP: Click the button"));

    assert_eq!(observer.count("recovery_planned"), 1);
    assert_eq!(driver.closes(), 1);
    assert_eq!(observer.count("session_closed"), 1);
}

#[tokio::test]
async fn session_open_failure_plans_recovery_and_summarizes() {
    let model = Arc::new(
        MockLanguageModel::new()
            .with_text(TaskKind::General, "Click go")
            .with_text(TaskKind::General, "1. Install a browser\n2. Retry"),
    );
    let driver =
        ScriptedDriver::new().failing_create(BrowserError::SessionLost("no browser".into()));
    let observer = RecordingObserver::new();

    let report = navigator(&model, &driver, &observer)
        .perform("search for cats")
        .await
        .unwrap();

    assert_eq!(
        report.run.errors,
        vec!["failed to open browser session: browser session lost: no browser".to_string()]
    );
    assert_eq!(report.run.steps, 1);
    assert_eq!(
        report.run.recovery_plan.as_deref(),
        Some("1. Install a browser\n2. Retry")
    );
    assert!(report.run.fallback_search.is_none());
    assert_eq!(report.status, GoalStatus::CompletedWithErrors);
    assert!(!report.summary.is_empty());

    // Plan, recovery, summary.
    assert_eq!(model.call_count(TaskKind::General), 3);
    let recovery_prompt = &model.prompts_for(TaskKind::General)[1];
    assert!(recovery_prompt.contains("ORIGINAL GOAL: search for cats"));
    assert!(recovery_prompt.contains("No steps completed"));

    assert_eq!(observer.count("recovery_planned"), 1);
    assert_eq!(observer.count("session_closed"), 0);
    assert_eq!(observer.count("goal_finished"), 1);
    assert!(driver.navigations().is_empty());
}

#[tokio::test]
async fn captured_calls_are_stored_indexed_and_summarized() {
    let model = Arc::new(
        MockLanguageModel::new().with_text(TaskKind::General, "Open https://shop.example.com"),
    );
    let request = CapturedRequest::new("get", "https://api.shop.example.com/items");
    let response = CapturedResponse::new(200, Some(serde_json::json!({"items": []})));
    let driver = ScriptedDriver::new().with_capture((request, Some(response)));
    let observer = RecordingObserver::new();
    let nav = navigator(&model, &driver, &observer);

    let report = nav.perform("find items in the shop").await.unwrap();

    assert_eq!(report.run.captures.len(), 1);
    let capture = &report.run.captures[0];
    assert!(capture.indexed);
    assert!(capture.replay_indexed);
    assert!(capture.persisted_id.is_some());

    let memory = nav.memory();
    assert!(memory.contains("api_GET_https://api.shop.example.com/items"));
    assert!(memory.contains("api_GET_https://api.shop.example.com/items_replay"));

    let stored = nav.list_recent_apis(5).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].response_status, Some(200));

    assert_eq!(observer.count("api_captured"), 1);
    let summary_prompt = model.prompts_for(TaskKind::General).pop().unwrap();
    assert!(summary_prompt.contains("APIs discovered:"));
}
