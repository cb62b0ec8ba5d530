//! Configuration for goal execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for planning, step execution and the search fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Pause after each step so page loads and network calls settle.
    /// Default: 1000
    pub settle_delay_ms: u64,

    /// History entries passed to the coding model as context.
    /// Default: 5
    pub history_context: usize,

    /// Search engine opened by the fallback search.
    /// Default: https://www.google.com
    pub search_engine_url: String,

    /// Name of the search engine's query input.
    /// Default: q
    pub search_field: String,

    /// Goal terms that enable the fallback search.
    pub search_triggers: Vec<String>,

    /// Step terms that mark a step as navigation.
    pub navigation_keywords: Vec<String>,

    /// Memory items considered when summarizing a goal.
    /// Default: 10
    pub summary_top_k: usize,

    /// Results returned by captured-API search.
    /// Default: 5
    pub api_search_top_k: usize,

    /// Page characters stored with each page visit.
    /// Default: 500
    pub page_excerpt_chars: usize,

    /// Page characters included in detailed-plan prompts.
    /// Default: 1500
    pub plan_page_chars: usize,

    /// Page characters included in UI analysis prompts.
    /// Default: 3000
    pub ui_page_chars: usize,

    /// Page characters included in action generation prompts.
    /// Default: 3000
    pub code_page_chars: usize,

    pub headless: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1_000,
            history_context: 5,
            search_engine_url: "https://www.google.com".to_string(),
            search_field: "q".to_string(),
            search_triggers: ["search", "find", "look up", "google", "check"]
                .into_iter()
                .map(String::from)
                .collect(),
            navigation_keywords: ["navigate", "go to", "open"]
                .into_iter()
                .map(String::from)
                .collect(),
            summary_top_k: 10,
            api_search_top_k: 5,
            page_excerpt_chars: 500,
            plan_page_chars: 1_500,
            ui_page_chars: 3_000,
            code_page_chars: 3_000,
            headless: false,
        }
    }
}

impl NavigatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal config for testing.
    pub fn minimal() -> Self {
        Self {
            settle_delay_ms: 0,
            headless: true,
            ..Self::default()
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Builder: set the per-step settle delay.
    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Builder: set headless sessions.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builder: set the fallback search engine.
    pub fn search_engine(mut self, url: impl Into<String>, field: impl Into<String>) -> Self {
        self.search_engine_url = url.into();
        self.search_field = field.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavigatorConfig::default();
        assert_eq!(config.settle_delay_ms, 1_000);
        assert_eq!(config.history_context, 5);
        assert_eq!(config.search_triggers.len(), 5);
        assert!(!config.headless);
    }

    #[test]
    fn test_builder() {
        let config = NavigatorConfig::new()
            .settle_delay_ms(10)
            .headless(true)
            .search_engine("https://duckduckgo.com", "q");
        assert_eq!(config.settle_delay(), Duration::from_millis(10));
        assert!(config.headless);
        assert_eq!(config.search_engine_url, "https://duckduckgo.com");
    }

    #[test]
    fn partial_yaml_like_input_keeps_defaults() {
        let config: NavigatorConfig =
            serde_json::from_str(r#"{"settle_delay_ms": 250}"#).unwrap();
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.search_field, "q");
    }
}
