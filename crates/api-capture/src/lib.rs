//! Captured API call handling for webnav.
//!
//! Network calls observed during a run are analyzed by the reasoning model,
//! written to an [`ApiRequestStore`], and indexed into semantic memory
//! together with generated replay code.

pub mod analyst;
pub mod config;
pub mod pipeline;
pub mod store;

use thiserror::Error;

pub use analyst::{ApiAnalyst, NO_SCHEMA_INPUT};
pub use config::CaptureConfig;
pub use pipeline::{
    api_memory_id, ApiCapturePipeline, CaptureReport, API_REPLAY_KIND, API_REQUEST_KIND,
};
pub use store::{ApiRequestStore, CapturedApiRequest, InMemoryApiStore, NewApiRequest};

/// Errors emitted by the capture surface.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
