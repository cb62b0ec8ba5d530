//! Coding-model prompts for step actions and free-form code.

use std::sync::Arc;

use webnav_core_types::{excerpt_with_ellipsis, LanguageModel, TaskKind};

const ACTION_FORMAT: &str = "Respond with a JSON array of actions and nothing else. Allowed actions:\n\
{\"action\": \"navigate\", \"url\": \"https://...\"}\n\
{\"action\": \"click\", \"selector\": \"CSS selector\"}\n\
{\"action\": \"type_text\", \"selector\": \"CSS selector\", \"text\": \"...\", \"submit\": true}\n\
{\"action\": \"wait\", \"selector\": \"CSS selector\", \"timeout_ms\": 5000}\n";

pub struct CodeAssistant {
    model: Arc<dyn LanguageModel>,
    page_chars: usize,
}

impl CodeAssistant {
    pub fn new(model: Arc<dyn LanguageModel>, page_chars: usize) -> Self {
        Self { model, page_chars }
    }

    /// Ask for an action script accomplishing `step` on the current page.
    pub async fn generate_action(
        &self,
        step: &str,
        current_url: &str,
        page_content: &str,
        recent_history: &[String],
    ) -> String {
        let previous = if recent_history.is_empty() {
            "No previous actions".to_string()
        } else {
            recent_history.join("\n")
        };
        let prompt = format!(
            "Produce browser actions to accomplish the following task:\n\n\
             GOAL: {step}\n\n\
             CURRENT URL: {current_url}\n\n\
             PREVIOUS ACTIONS:\n{previous}\n\n\
             PAGE CONTENT SAMPLE:\n{}\n\n\
             Prefer reliable selectors: IDs first, then names, then other CSS selectors.\n\
             {ACTION_FORMAT}",
            excerpt_with_ellipsis(page_content, self.page_chars),
        );
        self.model.generate_text(&prompt, TaskKind::Coding).await
    }

    /// Ask for a corrected script after `script` failed with `error`.
    pub async fn fix_action(&self, script: &str, error: &str) -> String {
        let prompt = format!(
            "The following browser action script failed:\n\n\
             SCRIPT:\n```json\n{script}\n```\n\n\
             ERROR MESSAGE: {error}\n\n\
             Return only the fixed script.\n\
             {ACTION_FORMAT}"
        );
        self.model.generate_text(&prompt, TaskKind::Coding).await
    }

    /// Free-form code for a task description. The result is shown, never run.
    pub async fn generate_code(&self, task: &str) -> String {
        self.model.generate_text(task, TaskKind::Coding).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webnav_core_types::MockLanguageModel;

    #[tokio::test]
    async fn action_prompt_carries_context() {
        let model = Arc::new(MockLanguageModel::new());
        let assistant = CodeAssistant::new(model.clone(), 10);
        assistant
            .generate_action(
                "Click login",
                "https://a",
                "0123456789abcdef",
                &["PLAN STEP: Click login".to_string()],
            )
            .await;

        let prompt = &model.prompts_for(TaskKind::Coding)[0];
        assert!(prompt.contains("GOAL: Click login"));
        assert!(prompt.contains("0123456789..."));
        assert!(!prompt.contains("abcdef"));
        assert!(prompt.contains("PLAN STEP: Click login"));
    }

    #[tokio::test]
    async fn empty_history_is_spelled_out() {
        let model = Arc::new(MockLanguageModel::new());
        CodeAssistant::new(model.clone(), 100)
            .generate_action("x", "", "", &[])
            .await;
        assert!(model.prompts_for(TaskKind::Coding)[0].contains("No previous actions"));
    }

    #[tokio::test]
    async fn fix_prompt_includes_error() {
        let model = Arc::new(MockLanguageModel::new());
        CodeAssistant::new(model.clone(), 100)
            .fix_action("[]", "element not found: #go")
            .await;
        assert!(model.prompts_for(TaskKind::Coding)[0].contains("ERROR MESSAGE: element not found: #go"));
    }
}
