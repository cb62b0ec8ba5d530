pub mod analyze;
pub mod apis;
pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod generate;
pub mod output;
pub mod plan;
pub mod run;
pub mod runtime;
pub mod shell;
