use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// What the code should do
    #[arg(required = true, num_args = 1..)]
    pub task: Vec<String>,

    /// Use the scripted offline model instead of the model service
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
struct GeneratedCode {
    task: String,
    code: String,
}

pub async fn cmd_generate(args: GenerateArgs, ctx: &CliContext) -> Result<()> {
    let task = args.task.join(" ");
    if task.trim().is_empty() {
        bail!("task description cannot be blank");
    }
    let navigator = ctx.navigator(NavigatorOptions {
        offline: args.offline,
        headless: true,
    })?;
    let code = navigator.generate_code(&task).await;
    emit(ctx.output(), &GeneratedCode { task, code }, |generated| {
        println!("{}", generated.code);
    })
}
