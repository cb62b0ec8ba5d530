//! Goal orchestration core for webnav.
//!
//! A goal is planned by the general model, each plan step is turned into a
//! constrained browser action script by the coding model, and everything the
//! run observes is recorded into semantic memory.

pub mod action;
pub mod browser;
pub mod code_assistant;
pub mod config;
pub mod errors;
pub mod navigator;
pub mod orchestrator;
pub mod plan_executor;
pub mod planner;
pub mod recovery;
pub mod report;
pub mod step_runner;

pub use action::{ActionDispatcher, ActionScript, BrowserAction};
pub use browser::{BrowserDriver, BrowserError, BrowserSession, CapturedExchange};
pub use code_assistant::CodeAssistant;
pub use config::NavigatorConfig;
pub use errors::AgentError;
pub use navigator::{Navigator, NavigatorBuilder};
pub use orchestrator::{GoalOrchestrator, SessionGuard};
pub use plan_executor::{classify_step, derive_search_term, extract_url, PlanExecutor};
pub use planner::{TaskPlanner, UiAnalysis};
pub use recovery::ErrorRecoveryPlanner;
pub use report::{ActionAttempt, GoalReport, PlanRunReport};
pub use step_runner::StepCodeRunner;
