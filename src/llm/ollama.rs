use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use webnav_core_types::{LanguageModel, ModelResponse, TaskKind};

use crate::config::ModelConfig;

/// Ollama HTTP client mapping each [`TaskKind`] onto a configured model.
///
/// Transport errors, timeouts, non-success statuses and `error` payloads all
/// come back as [`ModelResponse::Failure`]; nothing is raised to callers.
pub struct OllamaClient {
    client: Client,
    config: ModelConfig,
}

impl OllamaClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build HTTP client for the model service")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn complete(&self, model: &str, prompt: &str) -> ModelResponse {
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };
        match self.post::<_, GenerateResponse>("generate", &body).await {
            Ok(GenerateResponse {
                error: Some(error), ..
            }) => ModelResponse::Failure(error),
            Ok(GenerateResponse {
                response: Some(text),
                ..
            }) => ModelResponse::Text(text),
            Ok(_) => ModelResponse::Failure("model response missing text".to_string()),
            Err(reason) => ModelResponse::Failure(reason),
        }
    }

    async fn embed(&self, model: &str, prompt: &str) -> ModelResponse {
        let body = EmbeddingRequest { model, prompt };
        match self.post::<_, EmbeddingResponse>("embeddings", &body).await {
            Ok(EmbeddingResponse {
                error: Some(error), ..
            }) => ModelResponse::Failure(error),
            Ok(EmbeddingResponse {
                embedding: Some(values),
                ..
            }) => ModelResponse::Embedding(values),
            Ok(_) => ModelResponse::Failure("embedding response missing vector".to_string()),
            Err(reason) => ModelResponse::Failure(reason),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, String>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {err}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(format!("model service returned {status}: {text}"));
        }

        response
            .json::<R>()
            .await
            .map_err(|err| format!("model response invalid: {err}"))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str, task: TaskKind) -> ModelResponse {
        let model = self.config.model_for(task);
        debug!(target: "ollama", %task, model, prompt_chars = prompt.len(), "model request");
        let response = match task {
            TaskKind::Embedding => self.embed(model, prompt).await,
            _ => self.complete(model, prompt).await,
        };
        if let ModelResponse::Failure(reason) = &response {
            warn!(target: "ollama", %task, model, reason = %reason, "model request failed");
        }
        response
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = OllamaClient::new(ModelConfig {
            base_url: "http://localhost:11434/api/".into(),
            ..ModelConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("generate"),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn error_payload_wins_over_text() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("model not found"));
        assert!(parsed.response.is_none());
    }

    #[tokio::test]
    async fn unreachable_service_yields_failure() {
        let client = OllamaClient::new(ModelConfig {
            base_url: "http://127.0.0.1:9/api".into(),
            timeout_secs: 2,
            ..ModelConfig::default()
        })
        .unwrap();
        let response = client.generate("hello", TaskKind::General).await;
        assert!(response.is_failure());
        assert!(client
            .generate("hello", TaskKind::Embedding)
            .await
            .is_failure());
    }
}
