#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use agent_core::{BrowserAction, BrowserDriver, BrowserError, BrowserSession, CapturedExchange};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Everything the scripted browser saw, shared across its sessions.
#[derive(Default)]
pub struct BrowserState {
    pub sessions_opened: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub actions: Vec<BrowserAction>,
    pub page: String,
    pub title: String,
    pub action_results: VecDeque<Result<(), BrowserError>>,
    pub navigation_errors: HashMap<String, BrowserError>,
    /// Exchanges reported after the next navigation.
    pub pending_captures: Vec<CapturedExchange>,
    pub create_error: Option<BrowserError>,
}

#[derive(Clone, Default)]
pub struct ScriptedDriver {
    pub state: Arc<Mutex<BrowserState>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: &str) -> Self {
        self.state.lock().page = page.to_string();
        self
    }

    pub fn with_action_result(self, result: Result<(), BrowserError>) -> Self {
        self.state.lock().action_results.push_back(result);
        self
    }

    pub fn with_navigation_error(self, url: &str, error: BrowserError) -> Self {
        self.state
            .lock()
            .navigation_errors
            .insert(url.to_string(), error);
        self
    }

    pub fn with_capture(self, exchange: CapturedExchange) -> Self {
        self.state.lock().pending_captures.push(exchange);
        self
    }

    pub fn failing_create(self, error: BrowserError) -> Self {
        self.state.lock().create_error = Some(error);
        self
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn actions(&self) -> Vec<BrowserAction> {
        self.state.lock().actions.clone()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn create_session(
        &self,
        _headless: bool,
    ) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut state = self.state.lock();
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        state.sessions_opened += 1;
        Ok(Box::new(ScriptedSession {
            state: Arc::clone(&self.state),
            url: String::new(),
            captured: Vec::new(),
        }))
    }
}

pub struct ScriptedSession {
    state: Arc<Mutex<BrowserState>>,
    url: String,
    captured: Vec<CapturedExchange>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        state.navigations.push(url.to_string());
        if let Some(err) = state.navigation_errors.get(url) {
            return Err(err.clone());
        }
        self.url = url.to_string();
        self.captured.append(&mut state.pending_captures);
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    fn page_source(&self) -> String {
        self.state.lock().page.clone()
    }

    async fn run_action(&mut self, action: &BrowserAction) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        state.actions.push(action.clone());
        state.action_results.pop_front().unwrap_or(Ok(()))
    }

    async fn find(&mut self, _selector: &str) -> Result<bool, BrowserError> {
        Ok(true)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.state.lock().closes += 1;
        Ok(())
    }

    fn drain_captured(&mut self) -> Vec<CapturedExchange> {
        std::mem::take(&mut self.captured)
    }
}
