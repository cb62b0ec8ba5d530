//! webnav: goal-driven web navigation backed by a local model service.
//!
//! The agent crates hold the planning and execution logic; this crate wires
//! them to an HTTP page driver, the Ollama client and the command line.

pub mod browser_impl;
pub mod cli;
pub mod config;
pub mod llm;

pub use browser_impl::HttpBrowserDriver;
pub use config::AppConfig;
pub use llm::OllamaClient;
