//! Configuration for the API capture pipeline.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// HTTP library named in replay-code prompts.
    pub replay_library: String,
    /// Characters of item text kept per API in goal summaries.
    pub summary_text_chars: usize,
    /// Prior API calls listed in detailed-plan prompts.
    pub history_limit: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            replay_library: "requests".to_string(),
            summary_text_chars: 200,
            history_limit: 5,
        }
    }
}
