use std::sync::Arc;

use memory_center::SemanticMemoryStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use webnav_core_types::{
    CapturedRequest, CapturedResponse, EventObserver, LanguageModel, NavigatorEvent, RunLedger,
};

use crate::analyst::ApiAnalyst;
use crate::config::CaptureConfig;
use crate::store::{ApiRequestStore, NewApiRequest};

pub const API_REQUEST_KIND: &str = "api_request";
pub const API_REPLAY_KIND: &str = "api_replay_code";

/// What one pass through the pipeline managed to record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub persisted_id: Option<i64>,
    pub indexed: bool,
    pub replay_indexed: bool,
    pub analysis: String,
}

/// Memory id under which a captured request is indexed.
pub fn api_memory_id(request: &CapturedRequest) -> String {
    format!("api_{}_{}", request.method, request.url)
}

/// Analyze, persist and index captured network calls.
///
/// Persistence, request indexing and replay-code indexing are independent:
/// a failure in one is logged and the others still run.
pub struct ApiCapturePipeline {
    analyst: ApiAnalyst,
    memory: Arc<SemanticMemoryStore>,
    store: Arc<dyn ApiRequestStore>,
    observer: Arc<dyn EventObserver>,
    config: CaptureConfig,
}

impl ApiCapturePipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        memory: Arc<SemanticMemoryStore>,
        store: Arc<dyn ApiRequestStore>,
        observer: Arc<dyn EventObserver>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            analyst: ApiAnalyst::new(model, config.replay_library.clone()),
            memory,
            store,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn analyst(&self) -> &ApiAnalyst {
        &self.analyst
    }

    pub fn store(&self) -> &Arc<dyn ApiRequestStore> {
        &self.store
    }

    pub async fn process(
        &self,
        ledger: &mut RunLedger,
        request: CapturedRequest,
        response: Option<CapturedResponse>,
    ) -> CaptureReport {
        info!(method = %request.method, url = %request.url, "processing captured api call");
        ledger.captured_requests.push(request.clone());

        let analysis = self.analyst.analyze_pair(&request, response.as_ref()).await;

        let persisted_id = self.persist(&request, response.as_ref(), &analysis).await;

        let api_id = api_memory_id(&request);
        let indexed = self
            .index(
                &api_id,
                &request_memory_text(&request, response.as_ref(), &analysis),
                API_REQUEST_KIND,
                &request,
            )
            .await;

        let replay = self.analyst.replay_code(&request).await;
        let replay_indexed = self
            .index(
                &format!("{api_id}_replay"),
                &format!("API Replay Code for {}:\n{}", request.label(), replay),
                API_REPLAY_KIND,
                &request,
            )
            .await;

        ledger
            .history
            .record(format!("API CAPTURED: {}", request.label()));
        self.observer.on_event(&NavigatorEvent::ApiCaptured {
            method: request.method.clone(),
            url: request.url.clone(),
        });

        CaptureReport {
            persisted_id,
            indexed,
            replay_indexed,
            analysis,
        }
    }

    async fn persist(
        &self,
        request: &CapturedRequest,
        response: Option<&CapturedResponse>,
        analysis: &str,
    ) -> Option<i64> {
        let record = NewApiRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: json!(request.headers),
            body: request.body.clone().unwrap_or(Value::Null),
            response_status: response.map(|r| r.status),
            response_body: response.and_then(|r| r.body.clone()),
            analysis_notes: analysis.to_string(),
        };
        match self.store.insert_api_request(record).await {
            Ok(id) => {
                debug!(id, url = %request.url, "api request stored");
                Some(id)
            }
            Err(err) => {
                warn!(error = %err, url = %request.url, "storing api request failed");
                None
            }
        }
    }

    async fn index(&self, id: &str, text: &str, kind: &str, request: &CapturedRequest) -> bool {
        let metadata = json!({
            "type": kind,
            "url": request.url,
            "method": request.method,
        });
        let added = self.memory.add(id, text, metadata).await;
        if added {
            self.observer.on_event(&NavigatorEvent::MemoryIndexed {
                id: id.to_string(),
                kind: kind.to_string(),
            });
        } else {
            warn!(id, kind, "memory rejected api item");
        }
        added
    }
}

fn request_memory_text(
    request: &CapturedRequest,
    response: Option<&CapturedResponse>,
    analysis: &str,
) -> String {
    let headers = json!(request.headers);
    let body = request
        .body
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "None".to_string());
    let response_line = match response {
        Some(r) => format!(
            "{} {}",
            r.status,
            r.body.as_ref().map(Value::to_string).unwrap_or_default()
        ),
        None => "Not available".to_string(),
    };
    format!(
        "API Request: {}\nHeaders: {}\nBody: {}\nResponse: {}\nAnalysis: {}",
        request.label(),
        headers,
        body,
        response_line.trim_end(),
        analysis
    )
}
