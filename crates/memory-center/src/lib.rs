//! Semantic memory for webnav runs.
//!
//! Items are embedded through the model service and ranked by cosine
//! similarity with a linear scan. Embedding never fails from the caller's
//! point of view: a missing or invalid model embedding falls back to a
//! deterministic hash embedding, and failing that to a zero vector.

pub mod embedding;
pub mod similarity;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use webnav_core_types::{LanguageModel, TaskKind};

pub use embedding::{hash_embedding, EmbeddingSource};
pub use similarity::cosine_similarity;

pub const DEFAULT_EMBEDDING_DIM: usize = 768;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Dimensionality of fallback embeddings for the lifetime of a store.
    pub embedding_dim: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl MemoryItem {
    /// Value of the `type` metadata key, e.g. `api_request`.
    pub fn kind(&self) -> Option<&str> {
        self.metadata.get("type").and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub item: MemoryItem,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStatsSnapshot {
    pub current_items: u64,
    pub stored_items: u64,
    pub rejected_adds: u64,
    pub searches: u64,
    pub model_embeddings: u64,
    pub hash_fallbacks: u64,
    pub zero_fallbacks: u64,
}

#[derive(Default)]
struct MemoryMetrics {
    stores: AtomicU64,
    rejected: AtomicU64,
    searches: AtomicU64,
    model_embeddings: AtomicU64,
    hash_fallbacks: AtomicU64,
    zero_fallbacks: AtomicU64,
}

impl MemoryMetrics {
    fn record_embedding(&self, source: EmbeddingSource) {
        let counter = match source {
            EmbeddingSource::Model => &self.model_embeddings,
            EmbeddingSource::HashFallback => &self.hash_fallbacks,
            EmbeddingSource::Zero => &self.zero_fallbacks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-process semantic memory with insertion-ordered storage.
///
/// Not safe for concurrent goals: the duplicate-id check and the insert are
/// separate steps around the embedding call.
pub struct SemanticMemoryStore {
    model: Arc<dyn LanguageModel>,
    config: MemoryConfig,
    items: RwLock<Vec<MemoryItem>>,
    metrics: MemoryMetrics,
}

pub type SharedMemoryStore = Arc<SemanticMemoryStore>;

impl SemanticMemoryStore {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self::with_config(model, MemoryConfig::default())
    }

    pub fn with_config(model: Arc<dyn LanguageModel>, config: MemoryConfig) -> Self {
        Self {
            model,
            config,
            items: RwLock::new(Vec::new()),
            metrics: MemoryMetrics::default(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Embed and store `text` under `id`.
    ///
    /// Returns false without touching the store when `id` or `text` is empty
    /// or `id` is already present. `metadata` objects are stored as-is, `null`
    /// becomes an empty map and any other value is kept under `value`.
    pub async fn add(&self, id: &str, text: &str, metadata: Value) -> bool {
        if id.is_empty() || text.is_empty() {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(id, "memory add rejected: empty id or text");
            return false;
        }
        if self.contains(id) {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(id, "memory add rejected: duplicate id");
            return false;
        }

        let embedding = self.embed(text).await;

        let mut items = self.items.write();
        if items.iter().any(|item| item.id == id) {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        items.push(MemoryItem {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: normalize_metadata(metadata),
            created_at: Utc::now(),
        });
        self.metrics.stores.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Items most similar to `query`, best first, at most `top_k`.
    ///
    /// Equal scores keep insertion order. Items whose embedding length differs
    /// from the query embedding are skipped.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredMemory> {
        if query.is_empty() || self.is_empty() {
            return Vec::new();
        }
        self.metrics.searches.fetch_add(1, Ordering::Relaxed);
        let query_embedding = self.embed(query).await;

        let mut scored: Vec<ScoredMemory> = self
            .items
            .read()
            .iter()
            .filter(|item| item.embedding.len() == query_embedding.len())
            .map(|item| ScoredMemory {
                score: cosine_similarity(&query_embedding, &item.embedding),
                item: item.clone(),
            })
            .collect();

        // `sort_by` is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    /// Embed `text` through the model, falling back to a hash or zero vector.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let (vector, source) = self.embed_with_source(text).await;
        self.metrics.record_embedding(source);
        vector
    }

    async fn embed_with_source(&self, text: &str) -> (Vec<f32>, EmbeddingSource) {
        let response = self.model.generate(text, TaskKind::Embedding).await;
        if let Some(vector) = response.clone().into_valid_embedding() {
            return (vector, EmbeddingSource::Model);
        }
        warn!(
            response = ?summarize_response(&response),
            "embedding unavailable; using hash fallback"
        );
        match hash_embedding(text, self.config.embedding_dim) {
            Some(vector) => (vector, EmbeddingSource::HashFallback),
            None => (
                vec![0.0; self.config.embedding_dim],
                EmbeddingSource::Zero,
            ),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.read().iter().any(|item| item.id == id)
    }

    pub fn get(&self, id: &str) -> Option<MemoryItem> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    /// Snapshot copy of every item in insertion order.
    pub fn all(&self) -> Vec<MemoryItem> {
        self.items.read().clone()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn size(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn stats_snapshot(&self) -> MemoryStatsSnapshot {
        MemoryStatsSnapshot {
            current_items: self.size() as u64,
            stored_items: self.metrics.stores.load(Ordering::Relaxed),
            rejected_adds: self.metrics.rejected.load(Ordering::Relaxed),
            searches: self.metrics.searches.load(Ordering::Relaxed),
            model_embeddings: self.metrics.model_embeddings.load(Ordering::Relaxed),
            hash_fallbacks: self.metrics.hash_fallbacks.load(Ordering::Relaxed),
            zero_fallbacks: self.metrics.zero_fallbacks.load(Ordering::Relaxed),
        }
    }
}

fn normalize_metadata(metadata: Value) -> Map<String, Value> {
    match metadata {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn summarize_response(response: &webnav_core_types::ModelResponse) -> String {
    use webnav_core_types::ModelResponse;
    match response {
        ModelResponse::Failure(reason) => format!("failure: {reason}"),
        ModelResponse::Text(_) => "text instead of embedding".to_string(),
        ModelResponse::Embedding(values) => format!("invalid embedding of {} values", values.len()),
    }
}
