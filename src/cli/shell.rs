//! Interactive loop over one navigator, so memory and captures carry
//! across goals.

use std::sync::Arc;

use agent_core::Navigator;
use anyhow::Result;
use clap::Args;
use memory_center::ScoredMemory;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::cli::apis::print_rows;
use crate::cli::context::{CliContext, NavigatorOptions};
use crate::cli::output::ProgressPrinter;
use crate::cli::run::print_goal_report;

const MEMORY_RESULTS: usize = 5;
const DEFAULT_RECENT: usize = 10;

#[derive(Args, Clone, Debug)]
pub struct ShellArgs {
    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Use the scripted offline model instead of the model service
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Goal(String),
    Plan(String),
    Search(String),
    Apis(String),
    Recent(usize),
    Memory,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse one input line. Unknown verbs are treated as goals.
pub fn parse_shell_command(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let needs_text = |build: fn(String) -> ShellCommand, usage: &str| {
        if rest.is_empty() {
            ShellCommand::Invalid(format!("usage: {usage}"))
        } else {
            build(rest.to_string())
        }
    };
    match verb.to_ascii_lowercase().as_str() {
        "quit" | "exit" => ShellCommand::Quit,
        "help" | "?" => ShellCommand::Help,
        "memory" => ShellCommand::Memory,
        "goal" => needs_text(ShellCommand::Goal, "goal <description>"),
        "plan" => needs_text(ShellCommand::Plan, "plan <description>"),
        "search" => needs_text(ShellCommand::Search, "search <query>"),
        "apis" => needs_text(ShellCommand::Apis, "apis <query>"),
        "recent" if rest.is_empty() => ShellCommand::Recent(DEFAULT_RECENT),
        "recent" => match rest.parse() {
            Ok(limit) => ShellCommand::Recent(limit),
            Err(_) => ShellCommand::Invalid(format!("not a count: {rest}")),
        },
        _ => ShellCommand::Goal(line.to_string()),
    }
}

pub async fn cmd_shell(args: ShellArgs, ctx: &CliContext) -> Result<()> {
    let navigator = ctx.navigator(NavigatorOptions {
        offline: args.offline,
        headless: args.headless,
    })?;
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    println!("webnav shell. Type 'help' for commands.");
    loop {
        stdout.write_all(b"webnav> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_shell_command(&line) {
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Help => print_help(),
            ShellCommand::Invalid(message) => println!("{message}"),
            ShellCommand::Goal(goal) => run_goal(&navigator, ctx, goal).await,
            ShellCommand::Plan(goal) => {
                match navigator.plan_only(&goal, "Interactive shell session.").await {
                    Ok(plan) => println!("{plan}"),
                    Err(err) => println!("planning failed: {err}"),
                }
            }
            ShellCommand::Search(query) => {
                print_matches(&navigator.search_memory(&query, MEMORY_RESULTS).await)
            }
            ShellCommand::Apis(query) => {
                print_matches(&navigator.search_captured_apis(&query).await)
            }
            ShellCommand::Recent(limit) => match navigator.list_recent_apis(limit).await {
                Ok(rows) => print_rows(&rows),
                Err(err) => println!("could not list captured calls: {err}"),
            },
            ShellCommand::Memory => {
                let stats = navigator.memory().stats_snapshot();
                println!(
                    "{} item(s) in memory; {} stored, {} rejected, {} searches",
                    stats.current_items, stats.stored_items, stats.rejected_adds, stats.searches
                );
            }
        }
    }
    Ok(())
}

async fn run_goal(navigator: &Arc<Navigator>, ctx: &CliContext, goal: String) {
    let handle = match navigator.start_goal(goal) {
        Ok(handle) => handle,
        Err(err) => {
            println!("{err}");
            return;
        }
    };
    let printer = ProgressPrinter::spawn(ctx.bus(), ctx.output());
    let outcome = handle.await;
    printer.finish().await;
    match outcome {
        Ok(report) => print_goal_report(&report),
        Err(err) => warn!(?err, "goal task ended abnormally"),
    }
}

fn print_matches(matches: &[ScoredMemory]) {
    if matches.is_empty() {
        println!("No matches.");
    }
    for scored in matches {
        let kind = scored.item.kind().unwrap_or("item");
        println!("[{:.3}] {kind} {}", scored.score, scored.item.id);
        println!("        {}", webnav_core_types::excerpt(&scored.item.text, 160));
    }
}

fn print_help() {
    println!("Commands:");
    println!("  goal <text>     pursue a goal (bare text works too)");
    println!("  plan <text>     plan without executing");
    println!("  search <query>  search everything remembered");
    println!("  apis <query>    search captured API calls");
    println!("  recent [n]      list the latest captured calls");
    println!("  memory          memory statistics");
    println!("  quit            leave the shell");
}
