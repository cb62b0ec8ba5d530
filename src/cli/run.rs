use anyhow::Result;
use clap::Args;

use agent_core::GoalReport;
use webnav_core_types::GoalStatus;

use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::{emit, ProgressPrinter};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Natural-language goal to pursue
    #[arg(required = true, num_args = 1..)]
    pub goal: Vec<String>,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Use the scripted offline model instead of the model service
    #[arg(long)]
    pub offline: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let goal = args.goal.join(" ");
    let navigator = ctx.navigator(NavigatorOptions {
        offline: args.offline,
        headless: args.headless,
    })?;

    let printer = ProgressPrinter::spawn(ctx.bus(), ctx.output());
    let outcome = navigator.perform(goal).await;
    printer.finish().await;

    let report = outcome?;
    emit(ctx.output(), &report, print_goal_report)
}

pub fn print_goal_report(report: &GoalReport) {
    let status = match report.status {
        GoalStatus::Completed => "completed",
        GoalStatus::CompletedWithErrors => "completed with errors",
    };
    println!("Goal: {}", report.goal);
    println!("Status: {status} (run {})", report.run_id);
    println!(
        "Steps: {}  attempts: {}  failed: {}  api calls captured: {}",
        report.run.steps,
        report.run.attempts.len(),
        report.run.failed_attempts(),
        report.run.captures.len()
    );
    if let Some(term) = &report.run.fallback_search {
        println!("Fallback search: {term}");
    }
    if !report.run.errors.is_empty() {
        println!("\nErrors:");
        for error in &report.run.errors {
            println!("  - {error}");
        }
    }
    if let Some(plan) = &report.run.recovery_plan {
        println!("\nRecovery plan:\n{plan}");
    }
    println!("\nSummary:\n{}", report.summary);
}
