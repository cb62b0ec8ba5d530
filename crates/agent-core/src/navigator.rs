//! Entry points consumed by front ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use api_capture::{
    ApiCapturePipeline, ApiRequestStore, CaptureConfig, CaptureReport, CapturedApiRequest,
    InMemoryApiStore, API_REPLAY_KIND, API_REQUEST_KIND,
};
use memory_center::{MemoryConfig, ScoredMemory, SemanticMemoryStore};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;
use url::Url;
use webnav_core_types::{
    CapturedRequest, CapturedResponse, EventObserver, Goal, LanguageModel, NavigatorEvent,
    NoopObserver, RunLedger,
};

use crate::browser::BrowserDriver;
use crate::code_assistant::CodeAssistant;
use crate::config::NavigatorConfig;
use crate::errors::AgentError;
use crate::orchestrator::{GoalOrchestrator, SessionGuard};
use crate::plan_executor::PlanExecutor;
use crate::planner::{TaskPlanner, UiAnalysis};
use crate::recovery::ErrorRecoveryPlanner;
use crate::report::GoalReport;
use crate::step_runner::StepCodeRunner;

pub struct NavigatorBuilder {
    model: Arc<dyn LanguageModel>,
    driver: Arc<dyn BrowserDriver>,
    api_store: Option<Arc<dyn ApiRequestStore>>,
    observer: Option<Arc<dyn EventObserver>>,
    config: NavigatorConfig,
    memory_config: MemoryConfig,
    capture_config: CaptureConfig,
}

impl NavigatorBuilder {
    pub fn new(model: Arc<dyn LanguageModel>, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            model,
            driver,
            api_store: None,
            observer: None,
            config: NavigatorConfig::default(),
            memory_config: MemoryConfig::default(),
            capture_config: CaptureConfig::default(),
        }
    }

    pub fn api_store(mut self, store: Arc<dyn ApiRequestStore>) -> Self {
        self.api_store = Some(store);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn memory_config(mut self, config: MemoryConfig) -> Self {
        self.memory_config = config;
        self
    }

    pub fn capture_config(mut self, config: CaptureConfig) -> Self {
        self.capture_config = config;
        self
    }

    pub fn build(self) -> Navigator {
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(NoopObserver) as Arc<dyn EventObserver>);
        let api_store = self
            .api_store
            .unwrap_or_else(|| Arc::new(InMemoryApiStore::new()) as Arc<dyn ApiRequestStore>);
        let memory = Arc::new(SemanticMemoryStore::with_config(
            Arc::clone(&self.model),
            self.memory_config,
        ));
        let capture = Arc::new(ApiCapturePipeline::new(
            Arc::clone(&self.model),
            Arc::clone(&memory),
            api_store,
            Arc::clone(&observer),
            self.capture_config.clone(),
        ));
        let planner = Arc::new(TaskPlanner::new(
            Arc::clone(&self.model),
            &self.config,
            self.capture_config.history_limit,
        ));
        let assistant = Arc::new(CodeAssistant::new(
            Arc::clone(&self.model),
            self.config.code_page_chars,
        ));
        let executor = PlanExecutor::new(
            Arc::clone(&planner),
            StepCodeRunner::new(Arc::clone(&assistant), self.config.history_context),
            ErrorRecoveryPlanner::new(Arc::clone(&self.model)),
            Arc::clone(&memory),
            Arc::clone(&capture),
            Arc::clone(&observer),
            self.config.clone(),
        );
        let orchestrator = GoalOrchestrator::new(
            Arc::clone(&planner),
            executor,
            Arc::clone(&self.driver),
            Arc::clone(&memory),
            Arc::clone(&observer),
            self.config.clone(),
            self.capture_config.summary_text_chars,
        );

        Navigator {
            planner,
            assistant,
            orchestrator,
            driver: self.driver,
            memory,
            capture,
            observer,
            config: self.config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Clears the in-flight flag when the goal finishes or is dropped.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, AgentError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AgentError::GoalInFlight)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One navigator per browser identity: at most one goal runs at a time.
pub struct Navigator {
    planner: Arc<TaskPlanner>,
    assistant: Arc<CodeAssistant>,
    orchestrator: GoalOrchestrator,
    driver: Arc<dyn BrowserDriver>,
    memory: Arc<SemanticMemoryStore>,
    capture: Arc<ApiCapturePipeline>,
    observer: Arc<dyn EventObserver>,
    config: NavigatorConfig,
    in_flight: Arc<AtomicBool>,
}

impl Navigator {
    pub fn builder(model: Arc<dyn LanguageModel>, driver: Arc<dyn BrowserDriver>) -> NavigatorBuilder {
        NavigatorBuilder::new(model, driver)
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<SemanticMemoryStore> {
        &self.memory
    }

    pub fn is_goal_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start `goal` in the background. Rejected while another goal runs.
    pub fn start_goal(
        self: &Arc<Self>,
        goal: impl Into<Goal>,
    ) -> Result<JoinHandle<GoalReport>, AgentError> {
        let goal = validate_goal(goal.into())?;
        let guard = InFlightGuard::acquire(&self.in_flight)?;
        let navigator = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            navigator.orchestrator.perform(goal).await
        }))
    }

    /// Run `goal` to completion on the current task.
    pub async fn perform(&self, goal: impl Into<Goal>) -> Result<GoalReport, AgentError> {
        let goal = validate_goal(goal.into())?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        Ok(self.orchestrator.perform(goal).await)
    }

    pub async fn plan_only(&self, goal: &str, context: &str) -> Result<String, AgentError> {
        let goal = validate_goal(Goal::new(goal))?;
        Ok(self.planner.plan(goal.as_str(), context).await)
    }

    /// Plan against a live page (when `url` is given) and recently stored APIs.
    pub async fn detailed_plan(&self, goal: &str, url: Option<&str>) -> Result<String, AgentError> {
        let goal = validate_goal(Goal::new(goal))?;
        let api_history: Vec<CapturedRequest> = self
            .list_recent_apis(self.capture.config().history_limit)
            .await?
            .into_iter()
            .map(|row| CapturedRequest::new(row.method, row.url))
            .collect();

        let (current_url, page) = match url {
            Some(url) => {
                let url = validate_url(url)?;
                let session = self.driver.create_session(self.config.headless).await?;
                let mut guard = SessionGuard::new(session, Arc::clone(&self.observer));
                let loaded = async {
                    let session = guard.session_mut()?;
                    session.navigate(&url).await?;
                    Ok::<_, AgentError>((session.current_url(), session.page_source()))
                }
                .await;
                guard.release().await;
                loaded?
            }
            None => (String::new(), String::new()),
        };

        Ok(self
            .planner
            .detailed_plan(goal.as_str(), &current_url, &page, &api_history)
            .await)
    }

    /// Open `url` in a fresh session, analyze its UI and index the analysis.
    pub async fn analyze_page(&self, url: &str) -> Result<UiAnalysis, AgentError> {
        let url = validate_url(url)?;
        let session = self.driver.create_session(self.config.headless).await?;
        let mut guard = SessionGuard::new(session, Arc::clone(&self.observer));
        let analysis = async {
            let session = guard.session_mut()?;
            session.navigate(&url).await?;
            let current = session.current_url();
            let landed = if current.is_empty() { url.clone() } else { current };
            let page = session.page_source();
            Ok::<_, AgentError>(self.planner.analyze_ui(&page, &landed).await)
        }
        .await;
        guard.release().await;
        let analysis = analysis?;

        let id = format!("page_analysis_{}", analysis.url);
        let added = self
            .memory
            .add(
                &id,
                &analysis.full_analysis,
                json!({"type": "page_analysis", "url": analysis.url}),
            )
            .await;
        if added {
            self.observer.on_event(&NavigatorEvent::MemoryIndexed {
                id,
                kind: "page_analysis".to_string(),
            });
        }
        info!(url = %analysis.url, indexed = added, "page analyzed");
        Ok(analysis)
    }

    /// Semantic search over captured API calls and their replay code.
    pub async fn search_captured_apis(&self, query: &str) -> Vec<ScoredMemory> {
        let mut results = self.memory.search(query, self.memory.size()).await;
        results.retain(|scored| {
            matches!(scored.item.kind(), Some(API_REQUEST_KIND) | Some(API_REPLAY_KIND))
        });
        results.truncate(self.config.api_search_top_k);
        results
    }

    pub async fn search_memory(&self, query: &str, top_k: usize) -> Vec<ScoredMemory> {
        self.memory.search(query, top_k).await
    }

    pub async fn list_recent_apis(&self, limit: usize) -> Result<Vec<CapturedApiRequest>, AgentError> {
        Ok(self.capture.store().list_recent_api_requests(limit).await?)
    }

    /// Schema inferred from the most recent stored API calls.
    pub async fn infer_api_schema(&self, limit: usize) -> Result<String, AgentError> {
        let requests: Vec<CapturedRequest> = self
            .list_recent_apis(limit)
            .await?
            .into_iter()
            .map(|row| {
                let mut request = CapturedRequest::new(row.method, row.url);
                if let Some(headers) = row.headers.as_object() {
                    for (name, value) in headers {
                        if let Some(value) = value.as_str() {
                            request = request.with_header(name.clone(), value);
                        }
                    }
                }
                if !row.body.is_null() {
                    request = request.with_body(row.body);
                }
                request
            })
            .collect();
        Ok(self.capture.analyst().infer_schema(&requests).await)
    }

    pub async fn generate_code(&self, task: &str) -> String {
        self.assistant.generate_code(task).await
    }

    /// Feed one externally captured call through the capture pipeline.
    pub async fn capture_api(
        &self,
        request: CapturedRequest,
        response: Option<CapturedResponse>,
    ) -> CaptureReport {
        let mut ledger = RunLedger::new();
        self.capture.process(&mut ledger, request, response).await
    }
}

fn validate_goal(goal: Goal) -> Result<Goal, AgentError> {
    if goal.as_str().trim().is_empty() {
        return Err(AgentError::invalid_request("goal must not be empty"));
    }
    Ok(goal)
}

fn validate_url(url: &str) -> Result<String, AgentError> {
    let trimmed = url.trim();
    let candidate = if trimmed.starts_with("www.") {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };
    match Url::parse(&candidate) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(candidate),
        _ => Err(AgentError::invalid_request(format!("not a web URL: {url}"))),
    }
}
