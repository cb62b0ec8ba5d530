//! Constrained browser actions produced by the coding model.
//!
//! Generated scripts are JSON, never code: they are parsed into
//! [`BrowserAction`] values and interpreted by [`ActionDispatcher`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::browser::{BrowserError, BrowserSession};
use crate::errors::AgentError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Navigate {
        url: String,
    },
    Click {
        selector: String,
    },
    TypeText {
        selector: String,
        text: String,
        #[serde(default)]
        submit: bool,
    },
    Wait {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl BrowserAction {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::Navigate { .. } => "navigate",
            BrowserAction::Click { .. } => "click",
            BrowserAction::TypeText { .. } => "type_text",
            BrowserAction::Wait { .. } => "wait",
        }
    }
}

/// Ordered list of actions parsed from model output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionScript {
    pub actions: Vec<BrowserAction>,
}

impl ActionScript {
    pub fn new(actions: Vec<BrowserAction>) -> Self {
        Self { actions }
    }

    /// Parse model output holding a JSON array of actions or a single action.
    ///
    /// Markdown fences and surrounding prose are tolerated.
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let payload = extract_json_payload(raw)
            .ok_or_else(|| AgentError::action_parse("no JSON action payload found"))?;
        let value: Value =
            serde_json::from_str(payload).map_err(|err| AgentError::action_parse(err.to_string()))?;
        let actions = match value {
            Value::Array(_) => serde_json::from_value::<Vec<BrowserAction>>(value),
            Value::Object(_) => serde_json::from_value::<BrowserAction>(value).map(|a| vec![a]),
            other => {
                return Err(AgentError::action_parse(format!(
                    "expected an action object or array, got {other}"
                )))
            }
        }
        .map_err(|err| AgentError::action_parse(err.to_string()))?;
        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.actions).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Runs scripts against a session in order, stopping at the first failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionDispatcher;

impl ActionDispatcher {
    /// Returns the number of actions executed.
    pub async fn dispatch(
        &self,
        session: &mut dyn BrowserSession,
        script: &ActionScript,
    ) -> Result<usize, BrowserError> {
        for (index, action) in script.actions.iter().enumerate() {
            debug!(index, action = action.name(), "dispatching browser action");
            session.run_action(action).await?;
        }
        Ok(script.len())
    }
}

fn extract_json_payload(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```") {
        let after_start = &trimmed[start + 3..];
        if let Some(newline) = after_start.find('\n') {
            let body = &after_start[newline + 1..];
            if let Some(end) = body.rfind("```") {
                let candidate = body[..end].trim();
                if candidate.starts_with('[') || candidate.starts_with('{') {
                    return Some(candidate);
                }
            }
        }
    }

    let open = trimmed.find(['[', '{'])?;
    balanced_span(&trimmed[open..])
}

/// Span of the first balanced JSON value at the start of `text`.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let script = ActionScript::parse(
            r##"[{"action":"navigate","url":"https://example.com"},{"action":"click","selector":"#go"}]"##,
        )
        .unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(
            script.actions[0],
            BrowserAction::Navigate {
                url: "https://example.com".into()
            }
        );
    }

    #[test]
    fn parses_single_object_in_fence() {
        let raw = "Here you go:\n```json\n{\"action\": \"type_text\", \"selector\": \"[name=q]\", \"text\": \"cats\", \"submit\": true}\n```\n";
        let script = ActionScript::parse(raw).unwrap();
        assert_eq!(
            script.actions,
            vec![BrowserAction::TypeText {
                selector: "[name=q]".into(),
                text: "cats".into(),
                submit: true,
            }]
        );
    }

    #[test]
    fn parses_payload_inside_prose() {
        let raw = "Sure. [{\"action\":\"wait\",\"selector\":\"div[data-x=\\\"]\\\"]\"}] Done.";
        let script = ActionScript::parse(raw).unwrap();
        assert_eq!(script.actions[0].name(), "wait");
    }

    #[test]
    fn code_is_not_an_action_script() {
        let err = ActionScript::parse("driver.find_element(By.ID, 'x').click()").unwrap_err();
        assert!(matches!(err, AgentError::ActionParse(_)));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(ActionScript::parse(r#"[{"action":"execute_js","code":"alert(1)"}]"#).is_err());
    }

    #[test]
    fn empty_array_is_a_valid_noop() {
        assert!(ActionScript::parse("[]").unwrap().is_empty());
    }

    #[test]
    fn serializes_with_action_tag() {
        let script = ActionScript::new(vec![BrowserAction::Click {
            selector: "#a".into(),
        }]);
        assert_eq!(script.to_json(), r##"[{"action":"click","selector":"#a"}]"##);
    }
}
