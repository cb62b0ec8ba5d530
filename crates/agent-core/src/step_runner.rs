use std::sync::Arc;

use tracing::{debug, warn};
use webnav_core_types::{excerpt, ActionHistory, AttemptOutcome};

use crate::action::{ActionDispatcher, ActionScript};
use crate::browser::{BrowserError, BrowserSession};
use crate::code_assistant::CodeAssistant;
use crate::report::ActionAttempt;

const CODE_PREVIEW_CHARS: usize = 100;

/// Why a generated script did not run to completion.
enum ExecutionFailure {
    /// Script-level failure; eligible for the single fix-and-retry.
    Recoverable(String),
    Fatal(BrowserError),
}

/// Turns one step into an action script, runs it, and retries once after a fix.
///
/// A step executes at most two scripts in total. Only fatal browser errors
/// escape as `Err`; every other failure is reported in the [`ActionAttempt`].
pub struct StepCodeRunner {
    assistant: Arc<CodeAssistant>,
    dispatcher: ActionDispatcher,
    history_context: usize,
}

impl StepCodeRunner {
    pub fn new(assistant: Arc<CodeAssistant>, history_context: usize) -> Self {
        Self {
            assistant,
            dispatcher: ActionDispatcher,
            history_context,
        }
    }

    pub async fn run(
        &self,
        step: &str,
        session: &mut dyn BrowserSession,
        history: &mut ActionHistory,
    ) -> Result<ActionAttempt, BrowserError> {
        let recent = history.recent(self.history_context).to_vec();
        let code = self
            .assistant
            .generate_action(step, &session.current_url(), &session.page_source(), &recent)
            .await;
        history.record(format!(
            "GENERATED CODE: {}...",
            excerpt(&code, CODE_PREVIEW_CHARS)
        ));

        let first_error = match self.execute(session, &code).await {
            Ok(()) => {
                history.record("CODE EXECUTION: Success");
                return Ok(ActionAttempt {
                    step: step.to_string(),
                    generated_code: code,
                    fixed_code: None,
                    outcome: AttemptOutcome::Success,
                    error: None,
                    executions: 1,
                });
            }
            Err(ExecutionFailure::Fatal(err)) => return Err(err),
            Err(ExecutionFailure::Recoverable(err)) => err,
        };

        debug!(step, error = %first_error, "step script failed; requesting fix");
        history.record(format!("CODE EXECUTION ERROR: {first_error}"));
        let fixed = self.assistant.fix_action(&code, &first_error).await;
        history.record(format!(
            "FIXED CODE: {}...",
            excerpt(&fixed, CODE_PREVIEW_CHARS)
        ));

        let (outcome, error) = match self.execute(session, &fixed).await {
            Ok(()) => {
                history.record("CODE EXECUTION: Success");
                (AttemptOutcome::FixedSuccess, None)
            }
            Err(ExecutionFailure::Fatal(err)) => return Err(err),
            Err(ExecutionFailure::Recoverable(err)) => {
                warn!(step, error = %err, "fixed step script failed");
                history.record(format!("CODE EXECUTION FAILED: {err}"));
                (AttemptOutcome::Failed, Some(err))
            }
        };

        Ok(ActionAttempt {
            step: step.to_string(),
            generated_code: code,
            fixed_code: Some(fixed),
            outcome,
            error,
            executions: 2,
        })
    }

    async fn execute(
        &self,
        session: &mut dyn BrowserSession,
        code: &str,
    ) -> Result<(), ExecutionFailure> {
        let script = ActionScript::parse(code)
            .map_err(|err| ExecutionFailure::Recoverable(err.to_string()))?;
        match self.dispatcher.dispatch(session, &script).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_fatal() => Err(ExecutionFailure::Fatal(err)),
            Err(err) => Err(ExecutionFailure::Recoverable(err.to_string())),
        }
    }
}
