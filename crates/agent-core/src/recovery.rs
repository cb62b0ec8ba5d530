use std::sync::Arc;

use webnav_core_types::{LanguageModel, TaskKind};

/// Turns an unhandled error into a textual recovery strategy.
///
/// The plan is advisory only; nothing here touches the browser or memory.
pub struct ErrorRecoveryPlanner {
    model: Arc<dyn LanguageModel>,
}

impl ErrorRecoveryPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn plan(&self, error_context: &str, goal: &str, steps_completed: &[String]) -> String {
        let completed = if steps_completed.is_empty() {
            "No steps completed".to_string()
        } else {
            steps_completed
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {}", i + 1, step))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = format!(
            "An error occurred during web automation. Help create a recovery plan.\n\n\
             ORIGINAL GOAL: {goal}\n\n\
             STEPS COMPLETED:\n{completed}\n\n\
             ERROR: {error_context}\n\n\
             Please provide:\n\
             1. Analysis of what might have gone wrong\n\
             2. Alternate approaches to try\n\
             3. A new step-by-step plan to continue toward the original goal\n"
        );
        self.model.generate_text(&prompt, TaskKind::General).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webnav_core_types::MockLanguageModel;

    #[tokio::test]
    async fn completed_steps_are_numbered() {
        let model = Arc::new(MockLanguageModel::new().with_text(TaskKind::General, "retry later"));
        let planner = ErrorRecoveryPlanner::new(model.clone());
        let plan = planner
            .plan(
                "session lost",
                "find cats",
                &["PLAN STEP: a".to_string(), "NAVIGATION: Went to b".to_string()],
            )
            .await;

        assert_eq!(plan, "retry later");
        let prompt = &model.prompts_for(TaskKind::General)[0];
        assert!(prompt.contains("1. PLAN STEP: a\n2. NAVIGATION: Went to b"));
        assert!(prompt.contains("ERROR: session lost"));
    }

    #[tokio::test]
    async fn no_steps_is_spelled_out() {
        let model = Arc::new(MockLanguageModel::new());
        ErrorRecoveryPlanner::new(model.clone())
            .plan("boom", "goal", &[])
            .await;
        assert!(model.prompts_for(TaskKind::General)[0].contains("No steps completed"));
    }
}
