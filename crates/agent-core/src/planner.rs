//! General-model planning: goal plans and page analysis.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use webnav_core_types::{excerpt_with_ellipsis, CapturedRequest, LanguageModel, TaskKind};

use crate::config::NavigatorConfig;

/// Free-text analysis of one page's interface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UiAnalysis {
    pub url: String,
    pub full_analysis: String,
}

pub struct TaskPlanner {
    model: Arc<dyn LanguageModel>,
    plan_page_chars: usize,
    ui_page_chars: usize,
    api_history_limit: usize,
}

impl TaskPlanner {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        config: &NavigatorConfig,
        api_history_limit: usize,
    ) -> Self {
        Self {
            model,
            plan_page_chars: config.plan_page_chars,
            ui_page_chars: config.ui_page_chars,
            api_history_limit,
        }
    }

    /// High-level plan for `goal`, one step per line.
    pub async fn plan(&self, goal: &str, context: &str) -> String {
        let prompt = format!("Plan the steps to achieve: {goal}\nContext: {context}");
        self.model.generate_text(&prompt, TaskKind::General).await
    }

    /// Plan grounded in the current page and previously observed API calls.
    pub async fn detailed_plan(
        &self,
        goal: &str,
        current_url: &str,
        page_content: &str,
        api_history: &[CapturedRequest],
    ) -> String {
        let url = if current_url.is_empty() {
            "No current URL"
        } else {
            current_url
        };
        let mut api_section = String::new();
        if !api_history.is_empty() {
            api_section.push_str("Previously observed API patterns:\n");
            for (i, request) in api_history.iter().take(self.api_history_limit).enumerate() {
                api_section.push_str(&format!("{}. {}\n", i + 1, request.label()));
            }
        }
        let prompt = format!(
            "Create a detailed step-by-step plan to achieve this web automation goal:\n\n\
             GOAL: {goal}\n\n\
             CURRENT STATE:\n- URL: {url}\n- Page content sample: {}\n\n\
             {api_section}\n\n\
             Your plan should:\n\
             1. Break down the goal into clear, executable steps\n\
             2. Identify key UI elements that need to be interacted with\n\
             3. Anticipate potential challenges and include fallback approaches\n\
             4. Consider the most efficient path to the goal\n\
             5. Put each step on its own line\n",
            excerpt_with_ellipsis(page_content, self.plan_page_chars),
        );
        self.model.generate_text(&prompt, TaskKind::General).await
    }

    pub async fn analyze_ui(&self, page_content: &str, current_url: &str) -> UiAnalysis {
        let url = if current_url.is_empty() {
            "No URL"
        } else {
            current_url
        };
        let prompt = format!(
            "Analyze this webpage UI and identify key interactive elements.\n\n\
             URL: {url}\n\n\
             PAGE CONTENT:\n{}\n\n\
             Provide a structured analysis that includes:\n\
             1. Main purpose of this page\n\
             2. Key interactive elements (buttons, forms, links) and their likely functions\n\
             3. Navigation options available\n\
             4. Any authentication or input requirements\n\
             5. Overall page structure\n",
            excerpt_with_ellipsis(page_content, self.ui_page_chars),
        );
        UiAnalysis {
            url: current_url.to_string(),
            full_analysis: self.model.generate_text(&prompt, TaskKind::General).await,
        }
    }

    /// Narrative summary of a run, given excerpts of the APIs it discovered.
    pub async fn summarize(&self, goal: &str, api_snippets: &[String]) -> String {
        let mut api_info = String::new();
        if !api_snippets.is_empty() {
            api_info.push_str("APIs discovered:\n");
            for (i, snippet) in api_snippets.iter().enumerate() {
                api_info.push_str(&format!("{}. {}...\n", i + 1, snippet));
            }
        }
        let prompt = format!(
            "Summarize what was learned while pursuing this goal: '{goal}'\n\n\
             {api_info}\n\
             Focus on:\n\
             1. What was accomplished\n\
             2. What APIs or patterns were discovered\n\
             3. What might be useful for future automation\n"
        );
        self.model.generate_text(&prompt, TaskKind::General).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webnav_core_types::MockLanguageModel;

    fn planner(model: Arc<MockLanguageModel>) -> TaskPlanner {
        TaskPlanner::new(model, &NavigatorConfig::default(), 5)
    }

    #[tokio::test]
    async fn detailed_plan_lists_at_most_five_apis() {
        let model = Arc::new(MockLanguageModel::new());
        let history: Vec<CapturedRequest> = (0..7)
            .map(|i| CapturedRequest::new("get", format!("https://api.example.com/{i}")))
            .collect();

        planner(model.clone())
            .detailed_plan("find prices", "", &"x".repeat(2_000), &history)
            .await;

        let prompt = &model.prompts_for(TaskKind::General)[0];
        assert!(prompt.contains("5. GET https://api.example.com/4"));
        assert!(!prompt.contains("https://api.example.com/5"));
        assert!(prompt.contains("URL: No current URL"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(1_500))));
        assert!(!prompt.contains(&"x".repeat(1_501)));
    }

    #[tokio::test]
    async fn analyze_ui_wraps_model_text() {
        let model = Arc::new(MockLanguageModel::new().with_text(TaskKind::General, "login form"));
        let analysis = planner(model).analyze_ui("<form></form>", "https://a").await;
        assert_eq!(analysis.full_analysis, "login form");
        assert_eq!(analysis.url, "https://a");
    }

    #[tokio::test]
    async fn summary_lists_discovered_apis() {
        let model = Arc::new(MockLanguageModel::new());
        planner(model.clone())
            .summarize("find cats", &["API Request: GET https://cats".to_string()])
            .await;
        let prompt = &model.prompts_for(TaskKind::General)[0];
        assert!(prompt.contains("APIs discovered:\n1. API Request: GET https://cats..."));
    }
}
