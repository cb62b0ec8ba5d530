//! Application configuration
//!
//! One YAML document with a section per subsystem. Every field has a default,
//! so an empty or missing file is a valid configuration.

use std::env;
use std::path::PathBuf;

use agent_core::NavigatorConfig;
use api_capture::CaptureConfig;
use memory_center::MemoryConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use webnav_core_types::TaskKind;

/// Model service endpoint and the model used for each capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama API, including the `/api` prefix.
    pub base_url: String,
    pub general_model: String,
    pub coding_model: String,
    pub embedding_model: String,
    pub reasoning_model: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/api".to_string(),
            general_model: "hermes3".to_string(),
            coding_model: "granite-code:8b".to_string(),
            embedding_model: "mxbai-embed-large".to_string(),
            reasoning_model: "deepseek-r1:8b".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ModelConfig {
    pub fn model_for(&self, task: TaskKind) -> &str {
        match task {
            TaskKind::General => &self.general_model,
            TaskKind::Coding => &self.coding_model,
            TaskKind::Embedding => &self.embedding_model,
            TaskKind::Reasoning => &self.reasoning_model,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON Lines file backing the API request store. `null` keeps captured
    /// calls in memory only.
    pub api_store_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_store_path: dirs::data_local_dir()
                .map(|dir| dir.join("webnav").join("api_requests.jsonl")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Per-page fetch timeout.
    pub page_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub memory: MemoryConfig,
    pub navigator: NavigatorConfig,
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
    pub browser: BrowserSettings,
}

impl AppConfig {
    /// Apply `WEBNAV_*` and per-model environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WEBNAV_MODEL_URL") {
            self.model.base_url = url;
        }
        let models = [
            ("GENERAL_TEXT_MODEL", &mut self.model.general_model),
            ("CODING_MODEL", &mut self.model.coding_model),
            ("EMBEDDING_MODEL", &mut self.model.embedding_model),
            ("REASONING_MODEL", &mut self.model.reasoning_model),
        ];
        for (key, slot) in models {
            if let Some(value) = lookup(key) {
                info!(key, model = %value, "model override from environment");
                *slot = value;
            }
        }
        if let Some(raw) = lookup("WEBNAV_HEADLESS") {
            match parse_flag(&raw) {
                Some(headless) => self.navigator.headless = headless,
                None => warn!(value = %raw, "ignoring invalid WEBNAV_HEADLESS"),
            }
        }
        if let Some(path) = lookup("WEBNAV_API_STORE") {
            self.storage.api_store_path = Some(PathBuf::from(path));
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "model:\n  general_model: llama3\nnavigator:\n  settle_delay_ms: 0\n",
        )
        .unwrap();
        assert_eq!(config.model.general_model, "llama3");
        assert_eq!(config.model.coding_model, "granite-code:8b");
        assert_eq!(config.navigator.settle_delay_ms, 0);
        assert_eq!(config.navigator.summary_top_k, 10);
        assert_eq!(config.capture.summary_text_chars, 200);
        assert_eq!(config.browser.page_timeout_secs, 30);
    }

    #[test]
    fn null_store_path_means_in_memory() {
        let config: AppConfig = serde_yaml::from_str("storage:\n  api_store_path: null\n").unwrap();
        assert!(config.storage.api_store_path.is_none());
    }

    #[test]
    fn env_overrides_replace_models_and_flags() {
        let vars: HashMap<&str, &str> = [
            ("CODING_MODEL", "qwen2.5-coder"),
            ("WEBNAV_HEADLESS", "yes"),
            ("WEBNAV_API_STORE", "/tmp/apis.json"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.model.model_for(TaskKind::Coding), "qwen2.5-coder");
        assert_eq!(config.model.model_for(TaskKind::General), "hermes3");
        assert!(config.navigator.headless);
        assert_eq!(
            config.storage.api_store_path,
            Some(PathBuf::from("/tmp/apis.json"))
        );
    }

    #[test]
    fn invalid_headless_flag_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == "WEBNAV_HEADLESS").then(|| "maybe".to_string()));
        assert!(!config.navigator.headless);
    }
}
