use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;
use webnav_core_types::{AttemptOutcome, GoalStatus, NavigatorEvent};
use webnav_event_bus::{EventBus, InMemoryBus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Print `value` in the requested format; `human` renders the human form.
pub fn emit<T, F>(format: OutputFormat, value: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// One-line description of a progress event.
pub fn describe_event(event: &NavigatorEvent) -> String {
    match event {
        NavigatorEvent::GoalStarted { run_id, goal } => format!("goal started [{run_id}]: {goal}"),
        NavigatorEvent::PlanReady { steps } => format!("plan ready: {steps} step(s)"),
        NavigatorEvent::StepStarted { index, text, kind } => {
            format!("step {} ({kind:?}): {text}", index + 1)
        }
        NavigatorEvent::StepFinished { index, outcome } => {
            let outcome = match outcome {
                AttemptOutcome::Success => "ok",
                AttemptOutcome::FixedSuccess => "ok after fix",
                AttemptOutcome::Failed => "failed",
            };
            format!("step {} {outcome}", index + 1)
        }
        NavigatorEvent::Navigated { url } => format!("navigated to {url}"),
        NavigatorEvent::NavigationFailed { url, error } => {
            format!("navigation to {url} failed: {error}")
        }
        NavigatorEvent::FallbackSearch { term } => format!("searching for '{term}'"),
        NavigatorEvent::ApiCaptured { method, url } => format!("captured {method} {url}"),
        NavigatorEvent::MemoryIndexed { id, kind } => format!("remembered {kind}: {id}"),
        NavigatorEvent::RecoveryPlanned { error, .. } => {
            format!("recovery planned after: {error}")
        }
        NavigatorEvent::SummaryReady { .. } => "summary ready".to_string(),
        NavigatorEvent::SessionClosed => "browser session closed".to_string(),
        NavigatorEvent::GoalFinished { status, .. } => match status {
            GoalStatus::Completed => "goal completed".to_string(),
            GoalStatus::CompletedWithErrors => "goal completed with errors".to_string(),
        },
    }
}

fn render_event(event: &NavigatorEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => eprintln!("{line}"),
            Err(err) => debug!(?err, "event not serializable"),
        },
        OutputFormat::Human | OutputFormat::Yaml => eprintln!("  - {}", describe_event(event)),
    }
}

/// Renders navigator progress from the event bus onto stderr.
pub struct ProgressPrinter {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    pub fn spawn(bus: &Arc<InMemoryBus<NavigatorEvent>>, format: OutputFormat) -> Self {
        let mut rx = bus.subscribe();
        let (shutdown, mut stop) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => render_event(&event, format),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "progress printer lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = &mut stop => break,
                }
            }
            while let Ok(event) = rx.try_recv() {
                render_event(&event, format);
            }
        });
        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    /// Print whatever is still queued, then stop.
    pub async fn finish(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = self.handle.await {
            debug!(?err, "progress printer ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_numbers_are_one_based() {
        let event = NavigatorEvent::StepFinished {
            index: 0,
            outcome: AttemptOutcome::FixedSuccess,
        };
        assert_eq!(describe_event(&event), "step 1 ok after fix");
    }

    #[tokio::test]
    async fn finish_drains_queued_events() {
        let bus = InMemoryBus::<NavigatorEvent>::new(16);
        let printer = ProgressPrinter::spawn(&bus, OutputFormat::Human);
        bus.emit(NavigatorEvent::PlanReady { steps: 1 });
        bus.emit(NavigatorEvent::SessionClosed);
        printer.finish().await;
        assert_eq!(bus.subscriber_count(), 0);
    }
}
