use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use api_capture::CapturedApiRequest;

use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::emit;

const DEFAULT_LIMIT: usize = 10;

#[derive(Args, Clone, Debug)]
pub struct ApisArgs {
    #[command(subcommand)]
    pub action: ApisAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ApisAction {
    /// List the most recently captured API calls
    Recent {
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Infer a schema from recent captures
    Schema {
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Use the scripted offline model instead of the model service
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Debug, Serialize)]
struct SchemaOutput {
    rows: usize,
    schema: String,
}

pub async fn cmd_apis(args: ApisArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ApisAction::Recent { limit } => {
            let rows = ctx.api_store()?.list_recent_api_requests(limit).await?;
            emit(ctx.output(), &rows, |rows| print_rows(rows))
        }
        ApisAction::Schema { limit, offline } => {
            let navigator = ctx.navigator(NavigatorOptions {
                offline,
                headless: true,
            })?;
            let rows = navigator.list_recent_apis(limit).await?.len();
            let schema = navigator.infer_api_schema(limit).await?;
            emit(ctx.output(), &SchemaOutput { rows, schema }, |output| {
                println!("Schema inferred from {} captured call(s):\n", output.rows);
                println!("{}", output.schema);
            })
        }
    }
}

pub fn print_rows(rows: &[CapturedApiRequest]) {
    if rows.is_empty() {
        println!("No API calls captured yet.");
        return;
    }
    for row in rows {
        let status = row
            .response_status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<5} {} {:<6} {:<4} {}",
            row.id,
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.method,
            status,
            row.url
        );
    }
}
