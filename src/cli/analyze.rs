use anyhow::Result;
use clap::Args;

use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::{emit, ProgressPrinter};

#[derive(Args, Clone, Debug)]
pub struct AnalyzeArgs {
    /// Page to open and analyze
    pub url: String,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Use the scripted offline model instead of the model service
    #[arg(long)]
    pub offline: bool,
}

pub async fn cmd_analyze(args: AnalyzeArgs, ctx: &CliContext) -> Result<()> {
    let navigator = ctx.navigator(NavigatorOptions {
        offline: args.offline,
        headless: args.headless,
    })?;

    let printer = ProgressPrinter::spawn(ctx.bus(), ctx.output());
    let outcome = navigator.analyze_page(&args.url).await;
    printer.finish().await;

    let analysis = outcome?;
    emit(ctx.output(), &analysis, |analysis| {
        println!("Analysis of {}\n", analysis.url);
        println!("{}", analysis.full_analysis);
    })
}
