//! Contract for the language-model service.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability requested from the model service.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    General,
    Coding,
    Embedding,
    Reasoning,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::General => "general",
            TaskKind::Coding => "coding",
            TaskKind::Embedding => "embedding",
            TaskKind::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one model call.
///
/// The service never raises past its boundary; timeouts and transport
/// failures surface as [`ModelResponse::Failure`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ModelResponse {
    Text(String),
    Embedding(Vec<f32>),
    Failure(String),
}

impl ModelResponse {
    /// Text payload, or `None` for embeddings and failures.
    pub fn text(&self) -> Option<&str> {
        match self {
            ModelResponse::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Text payload, falling back to a marker that names the task and the reason.
    pub fn text_or_fallback(self, task: TaskKind) -> String {
        match self {
            ModelResponse::Text(text) => text,
            ModelResponse::Embedding(_) => {
                format!("[fallback response - {task} returned an embedding instead of text]")
            }
            ModelResponse::Failure(reason) => {
                format!("[fallback response - {task} unavailable: {reason}]")
            }
        }
    }

    /// Embedding payload when it is present, non-empty and finite.
    pub fn into_valid_embedding(self) -> Option<Vec<f32>> {
        match self {
            ModelResponse::Embedding(values)
                if !values.is_empty() && values.iter().all(|v| v.is_finite()) =>
            {
                Some(values)
            }
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ModelResponse::Failure(_))
    }
}

/// Language-model service used for planning, code, embeddings and reasoning.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, task: TaskKind) -> ModelResponse;

    /// Convenience wrapper returning text or the fallback marker.
    async fn generate_text(&self, prompt: &str, task: TaskKind) -> String {
        self.generate(prompt, task).await.text_or_fallback(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_embeddings_are_rejected() {
        assert!(ModelResponse::Embedding(vec![]).into_valid_embedding().is_none());
        assert!(ModelResponse::Embedding(vec![f32::NAN, 1.0])
            .into_valid_embedding()
            .is_none());
        assert!(ModelResponse::Text("[0.1, 0.2]".into())
            .into_valid_embedding()
            .is_none());
        assert_eq!(
            ModelResponse::Embedding(vec![0.5, 0.5]).into_valid_embedding(),
            Some(vec![0.5, 0.5])
        );
    }

    #[test]
    fn fallback_text_names_task_and_reason() {
        let text = ModelResponse::Failure("timeout".into()).text_or_fallback(TaskKind::Coding);
        assert!(text.contains("coding"));
        assert!(text.contains("timeout"));
    }

    #[test]
    fn response_serializes_with_kind_tag() {
        let json = serde_json::to_value(ModelResponse::Text("hi".into())).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["value"], "hi");
    }
}
