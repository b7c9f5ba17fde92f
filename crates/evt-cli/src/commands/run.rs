//! Run command: times a child process as a timing event.
//!
//! The event starts just before the child is spawned and fires once it
//! exits, whatever the exit status. Its volume is the wall-clock runtime in
//! whole seconds.

use std::io::Write;

use anyhow::{Context, Result};
use evt_core::Tracker;
use tokio::process::Command;

use crate::cli::RunArgs;
use crate::commands::Delivery;

/// Runs the command and returns the child's exit code.
pub async fn run<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    delivery: &Delivery,
    args: &RunArgs,
) -> Result<i32> {
    let (program, rest) = args
        .command
        .split_first()
        .context("no command given to run")?;

    let mut event = tracker
        .start(&args.tag)
        .with_context(|| format!("failed to start event {:?}", args.tag))?;

    let status = Command::new(program)
        .args(rest)
        .status()
        .await
        .with_context(|| format!("failed to run {program}"))?;

    event
        .fire(tracker)
        .with_context(|| format!("failed to fire event {:?}", args.tag))?;
    tracing::debug!(tag = %args.tag, %status, "command finished");

    delivery.finish(writer).await?;

    // Killed by a signal: report a generic failure.
    Ok(status.code().unwrap_or(1))
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use evt_core::{ManualClock, Timestamp, WireMessage};

    use super::*;

    fn run_args(tag: &str, command: &[&str]) -> RunArgs {
        RunArgs {
            tag: tag.to_string(),
            command: command.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn run_fires_timing_event_and_passes_exit_code() {
        let delivery = Delivery::preview(Arc::new(ManualClock::new(Timestamp::from_secs(300))));
        let tracker = delivery.tracker();

        let mut output = Vec::new();
        let code = run(&mut output, &tracker, &delivery, &run_args("build", &["sh", "-c", "exit 3"]))
            .await
            .unwrap();
        assert_eq!(code, 3);

        let message = WireMessage::parse(String::from_utf8(output).unwrap().trim()).unwrap();
        assert_eq!(message.events.len(), 1);
        assert_eq!(message.events[0].tag, "build");
        assert_eq!(message.events[0].when_arised, Timestamp::from_secs(300));
        assert_eq!(message.events[0].volume, Some(0));
    }

    #[tokio::test]
    async fn run_reports_missing_program() {
        let delivery = Delivery::preview(Arc::new(ManualClock::default()));
        let tracker = delivery.tracker();

        let mut output = Vec::new();
        let result = run(
            &mut output,
            &tracker,
            &delivery,
            &run_args("build", &["definitely-not-a-real-program-evt"]),
        )
        .await;
        assert!(result.is_err());
        assert!(output.is_empty());
    }
}
