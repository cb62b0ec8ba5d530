//! Contracts for the browser automation collaborator.

use async_trait::async_trait;
use thiserror::Error;
use webnav_core_types::{CapturedRequest, CapturedResponse};

use crate::action::BrowserAction;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("action failed: {0}")]
    Action(String),

    #[error("unsupported action: {0}")]
    Unsupported(String),

    /// The session is gone; nothing further can run against it.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl BrowserError {
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    /// Fatal errors abort the step loop and trigger recovery planning.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_))
    }
}

/// Network call observed by a session, with its response when one arrived.
pub type CapturedExchange = (CapturedRequest, Option<CapturedResponse>);

/// One live browser session.
///
/// The getters mirror the state after the last completed action; an empty
/// string means the value is not available.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    fn current_url(&self) -> String;

    fn title(&self) -> String;

    fn page_source(&self) -> String;

    async fn run_action(&mut self, action: &BrowserAction) -> Result<(), BrowserError>;

    /// Whether `selector` matches anything on the current page.
    async fn find(&mut self, selector: &str) -> Result<bool, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;

    /// Network calls observed since the previous drain.
    fn drain_captured(&mut self) -> Vec<CapturedExchange> {
        Vec::new()
    }
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn create_session(&self, headless: bool) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lost_sessions_are_fatal() {
        assert!(BrowserError::SessionLost("crashed".into()).is_fatal());
        assert!(!BrowserError::ElementNotFound("#q".into()).is_fatal());
        assert!(!BrowserError::navigation("https://x", "timeout").is_fatal());
        assert!(!BrowserError::Unsupported("click".into()).is_fatal());
    }
}
