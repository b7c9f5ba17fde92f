//! CLI subcommand implementations.

pub mod fire;
pub mod run;

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use evt_core::{Clock, Dispatcher, Event, EventBatch, Tracker, TrackerError};
use evt_http::{FlushMode, FlushOutcome, HttpDispatcher};

use crate::Config;

/// Holds fired events so a dry run can print them.
#[derive(Debug, Default)]
pub struct PreviewDispatcher {
    batch: Mutex<EventBatch>,
}

impl Dispatcher for PreviewDispatcher {
    fn submit(&self, event: &Event) -> Result<(), TrackerError> {
        self.batch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_event(event)
    }
}

#[derive(Debug)]
enum Target {
    Preview(Arc<PreviewDispatcher>),
    Http(Arc<HttpDispatcher>),
}

/// Where the events fired by one invocation end up.
pub struct Delivery {
    clock: Arc<dyn Clock>,
    target: Target,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl Delivery {
    /// Prints the batch on [`finish`](Self::finish) instead of sending it.
    pub fn preview(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            target: Target::Preview(Arc::default()),
        }
    }

    /// Posts the batch to the configured endpoint, or previews on a dry run.
    pub fn from_config(config: &Config, dry_run: bool, clock: Arc<dyn Clock>) -> Result<Self> {
        if dry_run {
            return Ok(Self::preview(clock));
        }

        let endpoint = config.resolve_endpoint().context(
            "no collector endpoint configured; set `endpoint` or `server` in config.toml, \
             or EVT_ENDPOINT",
        )?;
        let dispatcher = HttpDispatcher::with_timeout(&endpoint, config.timeout())
            .context("failed to create HTTP dispatcher")?
            .with_clock(clock.clone());

        Ok(Self {
            clock,
            target: Target::Http(Arc::new(dispatcher)),
        })
    }

    /// A tracker wired to this delivery's dispatcher.
    pub fn tracker(&self) -> Tracker {
        let mut tracker = Tracker::with_clock(self.clock.clone());
        match &self.target {
            Target::Preview(dispatcher) => tracker.set_dispatcher(dispatcher.clone()),
            Target::Http(dispatcher) => tracker.set_dispatcher(dispatcher.clone()),
        }
        tracker
    }

    /// Prints or sends everything fired so far.
    pub async fn finish<W: Write>(&self, writer: &mut W) -> Result<()> {
        match &self.target {
            Target::Preview(dispatcher) => {
                let json = dispatcher
                    .batch
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .serialize(self.clock.now())
                    .context("failed to serialize batch")?;
                writeln!(writer, "{json}")?;
            }
            Target::Http(dispatcher) => match dispatcher.flush(FlushMode::Sync).await {
                Some(FlushOutcome::Delivered { events }) => {
                    tracing::info!(events, endpoint = dispatcher.endpoint(), "batch delivered");
                }
                Some(FlushOutcome::Failed) | None => {
                    anyhow::bail!(
                        "failed to deliver {} event(s) to {}",
                        dispatcher.pending(),
                        dispatcher.endpoint()
                    );
                }
            },
        }
        Ok(())
    }
}
