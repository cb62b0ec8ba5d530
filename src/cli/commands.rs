use clap::Subcommand;

use super::analyze::AnalyzeArgs;
use super::apis::ApisArgs;
use super::config::ConfigArgs;
use super::generate::GenerateArgs;
use super::plan::PlanArgs;
use super::run::RunArgs;
use super::shell::ShellArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Pursue a goal in a fresh browser session
    Run(RunArgs),

    /// Produce a plan for a goal without executing it
    Plan(PlanArgs),

    /// Analyze the interface of a single page
    Analyze(AnalyzeArgs),

    /// Inspect captured API calls
    Apis(ApisArgs),

    /// Generate code for a task description
    Generate(GenerateArgs),

    /// Interactive session sharing memory across goals
    Shell(ShellArgs),

    /// Manage webnav configuration
    Config(ConfigArgs),
}
