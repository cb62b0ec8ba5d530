//! Model prompts for understanding and replaying captured API calls.

use std::sync::Arc;

use serde_json::{json, Value};
use webnav_core_types::{CapturedRequest, CapturedResponse, LanguageModel, TaskKind};

pub const NO_SCHEMA_INPUT: &str = "No requests provided for schema inference";

pub struct ApiAnalyst {
    model: Arc<dyn LanguageModel>,
    replay_library: String,
}

impl ApiAnalyst {
    pub fn new(model: Arc<dyn LanguageModel>, replay_library: impl Into<String>) -> Self {
        Self {
            model,
            replay_library: replay_library.into(),
        }
    }

    /// Reasoning-model analysis of one request/response pair.
    pub async fn analyze_pair(
        &self,
        request: &CapturedRequest,
        response: Option<&CapturedResponse>,
    ) -> String {
        let response_text = response
            .map(|r| pretty(&response_json(r)))
            .unwrap_or_else(|| "Not available".to_string());
        let prompt = format!(
            "Analyze this captured API request and its response as an expert at reverse engineering APIs.\n\n\
             REQUEST:\n{}\n\n\
             RESPONSE: {}\n\n\
             Provide analysis covering:\n\
             1. What is the purpose of this API endpoint?\n\
             2. What authentication mechanism is used (if any)?\n\
             3. What are the key parameters and their meaning?\n\
             4. How could this request be replayed or automated?\n\
             5. Are there any security concerns or potential optimizations?\n",
            pretty(&request_json(request)),
            response_text,
        );
        self.model.generate_text(&prompt, TaskKind::Reasoning).await
    }

    /// Infer the general schema shared by several related requests.
    pub async fn infer_schema(&self, requests: &[CapturedRequest]) -> String {
        if requests.is_empty() {
            return NO_SCHEMA_INPUT.to_string();
        }
        let listing: Vec<Value> = requests.iter().map(request_json).collect();
        let prompt = format!(
            "You are an expert at reverse engineering APIs. \
             Given these similar API requests, infer the general API schema and patterns:\n\n\
             {}\n\n\
             Please provide:\n\
             1. The general API schema (endpoint patterns, parameter structures)\n\
             2. Common headers or authentication patterns\n\
             3. Required vs optional parameters\n\
             4. How pagination appears to work (if relevant)\n\
             5. Any REST/GraphQL/RPC conventions that appear to be followed\n",
            pretty(&Value::Array(listing)),
        );
        self.model.generate_text(&prompt, TaskKind::Reasoning).await
    }

    /// Coding-model snippet that reproduces `request`.
    pub async fn replay_code(&self, request: &CapturedRequest) -> String {
        let prompt = format!(
            "Generate Python code using the {} library to replay this API request:\n\n\
             ```\n{}\n```\n\n\
             The code should:\n\
             1. Include all necessary imports\n\
             2. Preserve all headers and parameters exactly\n\
             3. Handle the response appropriately\n\
             4. Be well-structured and maintainable\n",
            self.replay_library,
            pretty(&request_json(request)),
        );
        self.model.generate_text(&prompt, TaskKind::Coding).await
    }
}

pub(crate) fn request_json(request: &CapturedRequest) -> Value {
    json!({
        "method": request.method,
        "url": request.url,
        "headers": request.headers,
        "body": request.body,
    })
}

pub(crate) fn response_json(response: &CapturedResponse) -> Value {
    json!({
        "status_code": response.status,
        "body": response.body,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webnav_core_types::MockLanguageModel;

    #[tokio::test]
    async fn empty_schema_input_skips_the_model() {
        let model = Arc::new(MockLanguageModel::new());
        let analyst = ApiAnalyst::new(model.clone(), "requests");
        assert_eq!(analyst.infer_schema(&[]).await, NO_SCHEMA_INPUT);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn prompts_route_to_expected_capabilities() {
        let model = Arc::new(MockLanguageModel::new());
        let analyst = ApiAnalyst::new(model.clone(), "httpx");
        let request = CapturedRequest::new("post", "https://api.example.com/login");

        analyst.analyze_pair(&request, None).await;
        analyst.replay_code(&request).await;

        let reasoning = model.prompts_for(TaskKind::Reasoning);
        assert!(reasoning[0].contains("RESPONSE: Not available"));
        assert!(reasoning[0].contains("https://api.example.com/login"));
        let coding = model.prompts_for(TaskKind::Coding);
        assert!(coding[0].contains("the httpx library"));
    }
}
