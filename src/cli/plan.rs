use anyhow::Result;
use clap::Args;
use serde::Serialize;
use webnav_core_types::parse_plan;

use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::emit;

const DEFAULT_CONTEXT: &str = "Starting a new browsing session.";

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Goal to plan for
    #[arg(required = true, num_args = 1..)]
    pub goal: Vec<String>,

    /// Free-text context handed to the planner
    #[arg(long, default_value = DEFAULT_CONTEXT)]
    pub context: String,

    /// Ground the plan in this page and previously captured APIs
    #[arg(long)]
    pub url: Option<String>,

    /// Detailed plan using captured APIs even without a page
    #[arg(long)]
    pub detailed: bool,

    /// Use the scripted offline model instead of the model service
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    goal: String,
    plan: String,
    steps: Vec<String>,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext) -> Result<()> {
    let goal = args.goal.join(" ");
    let navigator = ctx.navigator(NavigatorOptions {
        offline: args.offline,
        headless: true,
    })?;

    let plan = if args.detailed || args.url.is_some() {
        navigator.detailed_plan(&goal, args.url.as_deref()).await?
    } else {
        navigator.plan_only(&goal, &args.context).await?
    };

    let output = PlanOutput {
        steps: parse_plan(&plan).into_iter().map(|step| step.text).collect(),
        goal,
        plan,
    };
    emit(ctx.output(), &output, |output| {
        println!("Plan for: {}", output.goal);
        if output.steps.is_empty() {
            println!("  (the planner returned no steps)");
        }
        for (index, step) in output.steps.iter().enumerate() {
            println!("{:>3}. {}", index + 1, step);
        }
    })
}
