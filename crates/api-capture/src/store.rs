//! Relational-style storage of captured API calls.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::CaptureError;

/// A captured call as handed to the store, before an id is assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewApiRequest {
    pub method: String,
    pub url: String,
    pub headers: Value,
    pub body: Value,
    pub response_status: Option<u16>,
    pub response_body: Option<Value>,
    pub analysis_notes: String,
}

/// One stored row per captured network call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedApiRequest {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub headers: Value,
    pub body: Value,
    pub response_status: Option<u16>,
    pub response_body: Option<Value>,
    pub analysis_notes: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ApiRequestStore: Send + Sync {
    /// Insert one row and return its id. A failed insert leaves no row behind.
    async fn insert_api_request(&self, record: NewApiRequest) -> Result<i64, CaptureError>;

    /// Most recent rows first.
    async fn list_recent_api_requests(
        &self,
        limit: usize,
    ) -> Result<Vec<CapturedApiRequest>, CaptureError>;
}

#[derive(Default)]
struct StoreState {
    rows: Vec<CapturedApiRequest>,
    next_id: i64,
}

/// Process-local API request store, optionally mirrored to a JSON Lines
/// file (one row per line, appended on insert).
pub struct InMemoryApiStore {
    state: Mutex<StoreState>,
    storage_path: Option<PathBuf>,
    // Serializes inserts so ids and file lines stay in the same order.
    write_lock: tokio::sync::Mutex<()>,
}

impl Default for InMemoryApiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryApiStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                rows: Vec::new(),
                next_id: 1,
            }),
            storage_path: None,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a store backed by `path`, loading rows already written there.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let path = path.into();
        let mut rows: Vec<CapturedApiRequest> = Vec::new();
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            for line in contents.lines().filter(|line| !line.trim().is_empty()) {
                rows.push(serde_json::from_str(line)?);
            }
        }
        let next_id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        debug!(path = %path.display(), rows = rows.len(), "api store loaded");
        Ok(Self {
            state: Mutex::new(StoreState { rows, next_id }),
            storage_path: Some(path),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().rows.is_empty()
    }
}

async fn append_row(path: &Path, row: &CapturedApiRequest) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut line = serde_json::to_vec(row)?;
    line.push(b'\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl ApiRequestStore for InMemoryApiStore {
    async fn insert_api_request(&self, record: NewApiRequest) -> Result<i64, CaptureError> {
        let _writer = self.write_lock.lock().await;
        let row = CapturedApiRequest {
            id: self.state.lock().next_id,
            method: record.method,
            url: record.url,
            headers: record.headers,
            body: record.body,
            response_status: record.response_status,
            response_body: record.response_body,
            analysis_notes: record.analysis_notes,
            timestamp: Utc::now(),
        };

        if let Some(path) = self.storage_path.as_deref() {
            append_row(path, &row).await.map_err(|err| {
                CaptureError::Persistence(format!("failed to write api store: {err}"))
            })?;
        }

        let id = row.id;
        let mut state = self.state.lock();
        state.rows.push(row);
        state.next_id += 1;
        Ok(id)
    }

    async fn list_recent_api_requests(
        &self,
        limit: usize,
    ) -> Result<Vec<CapturedApiRequest>, CaptureError> {
        let mut rows = self.state.lock().rows.clone();
        // Ids break timestamp ties so rows inserted in the same instant stay ordered.
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
