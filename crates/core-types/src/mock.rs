use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{LanguageModel, ModelResponse, TaskKind};

/// Deterministic model used for tests and offline runs.
///
/// Responses are served from a per-task queue first, then from a per-task
/// default, then from a built-in default (`[]` for coding so generated
/// action scripts are empty but valid, a failure for embeddings, and a
/// canned sentence otherwise). Every call is logged.
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    queues: Mutex<HashMap<TaskKind, VecDeque<ModelResponse>>>,
    defaults: Mutex<HashMap<TaskKind, ModelResponse>>,
    calls: Mutex<Vec<(TaskKind, String)>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: queue a response for `task`.
    pub fn with_response(self, task: TaskKind, response: ModelResponse) -> Self {
        self.push(task, response);
        self
    }

    /// Builder: queue a text response for `task`.
    pub fn with_text(self, task: TaskKind, text: impl Into<String>) -> Self {
        self.push(task, ModelResponse::Text(text.into()));
        self
    }

    /// Builder: response served once the queue for `task` is drained.
    pub fn with_default(self, task: TaskKind, response: ModelResponse) -> Self {
        self.defaults.lock().insert(task, response);
        self
    }

    pub fn push(&self, task: TaskKind, response: ModelResponse) {
        self.queues.lock().entry(task).or_default().push_back(response);
    }

    pub fn calls(&self) -> Vec<(TaskKind, String)> {
        self.calls.lock().clone()
    }

    /// Prompts sent for one capability, in call order.
    pub fn prompts_for(&self, task: TaskKind) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == task)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn call_count(&self, task: TaskKind) -> usize {
        self.calls.lock().iter().filter(|(kind, _)| *kind == task).count()
    }

    fn builtin_default(task: TaskKind) -> ModelResponse {
        match task {
            TaskKind::Coding => ModelResponse::Text("[]".to_string()),
            TaskKind::Embedding => ModelResponse::Failure("no embedding scripted".to_string()),
            other => ModelResponse::Text(format!("mock {other} response")),
        }
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, prompt: &str, task: TaskKind) -> ModelResponse {
        self.calls.lock().push((task, prompt.to_string()));
        if let Some(response) = self
            .queues
            .lock()
            .get_mut(&task)
            .and_then(|queue| queue.pop_front())
        {
            return response;
        }
        self.defaults
            .lock()
            .get(&task)
            .cloned()
            .unwrap_or_else(|| Self::builtin_default(task))
    }
}
