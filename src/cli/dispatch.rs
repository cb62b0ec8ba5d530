use super::analyze::cmd_analyze;
use super::apis::cmd_apis;
use super::config::cmd_config;
use super::generate::cmd_generate;
use super::plan::cmd_plan;
use super::run::cmd_run;
use super::shell::cmd_shell;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use crate::cli::env::CliArgs;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Plan(args) => cmd_plan(args, ctx).await,
        Commands::Analyze(args) => cmd_analyze(args, ctx).await,
        Commands::Apis(args) => cmd_apis(args, ctx).await,
        Commands::Generate(args) => cmd_generate(args, ctx).await,
        Commands::Shell(args) => cmd_shell(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
