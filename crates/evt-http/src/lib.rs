//! HTTP delivery for evt batches.
//!
//! [`HttpDispatcher`] accumulates fired events and posts the serialized
//! batch to a collection endpoint on [`flush`](HttpDispatcher::flush).
//!
//! Transport failures are expected runtime conditions. They never surface
//! as errors: the batch stays pending and the error callback runs, so the
//! caller can retry the flush or discard the events with
//! [`drop_events`](HttpDispatcher::drop_events).
//!
//! # Thread Safety
//!
//! The pending batch sits behind a single mutex covering submit, flush and
//! drop. Every submitted event gets a sequence number. A flush snapshots the
//! batch and the sequence just past its last event, then releases the lock
//! while the request is in flight. On success it removes only pending
//! events below that sequence, so events submitted during the request wait
//! for the next flush and overlapping flushes never remove each other's
//! unsent events. A `drop_events` during the request wins: nothing is
//! removed afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use evt_core::{Clock, Dispatcher, Event, EventBatch, SystemClock, TrackerError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Default request timeout for flushes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP dispatcher errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The endpoint is not an http(s) URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The collector answered with a non-success status.
    #[error("collector returned {0}")]
    Status(StatusCode),
    /// The batch could not be serialized.
    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whether [`HttpDispatcher::flush`] waits for delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// Wait for the collector to answer.
    Sync,
    /// Send on a background task and return immediately.
    #[default]
    Async,
}

/// Result of a completed flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The collector accepted the batch.
    Delivered { events: usize },
    /// Delivery failed; the batch is still pending.
    Failed,
}

type Callback = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct Pending {
    batch: EventBatch,
    /// Sequence number of the oldest event in `batch`.
    head: u64,
}

impl Pending {
    /// Sequence number the next submitted event will get.
    fn tail(&self) -> u64 {
        self.head + self.batch.len() as u64
    }

    /// Removes every pending event numbered below `end`.
    fn acknowledge(&mut self, end: u64) -> usize {
        let Ok(count) = usize::try_from(end.saturating_sub(self.head)) else {
            return 0;
        };
        let count = count.min(self.batch.len());
        self.batch.remove_delivered(count);
        self.head += count as u64;
        count
    }

    /// Discards the batch while keeping sequence numbers increasing.
    fn discard(&mut self) -> usize {
        let dropped = self.batch.len();
        self.head = self.tail();
        self.batch = EventBatch::new();
        dropped
    }
}

/// Dispatcher that posts batches to an HTTP endpoint.
pub struct HttpDispatcher {
    endpoint: Url,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    pending: Mutex<Pending>,
    on_success: Callback,
    on_error: Callback,
}

impl fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("endpoint", &self.endpoint.as_str())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl HttpDispatcher {
    /// Creates a dispatcher posting to `endpoint` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the HTTP
    /// client fails to build.
    pub fn new(endpoint: &str) -> Result<Self, HttpError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Creates a dispatcher with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Same as [`HttpDispatcher::new`].
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, HttpError> {
        let endpoint = parse_endpoint(endpoint)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::ClientBuild)?;

        Ok(Self {
            endpoint,
            http,
            clock: Arc::new(SystemClock),
            pending: Mutex::new(Pending::default()),
            on_success: Box::new(|| {}),
            on_error: Box::new(|| {}),
        })
    }

    /// Uses `clock` to stamp `whenSent` on serialized batches.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs `callback` after every successful flush.
    #[must_use]
    pub fn with_on_success(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Box::new(callback);
        self
    }

    /// Runs `callback` after every failed flush.
    #[must_use]
    pub fn with_on_error(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_error = Box::new(callback);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Number of events waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock_pending().batch.len()
    }

    /// Serializes the pending batch without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be serialized.
    pub fn preview(&self) -> Result<String, HttpError> {
        let pending = self.lock_pending();
        Ok(pending.batch.serialize(self.clock.now())?)
    }

    /// Discards all pending events without contacting the collector.
    ///
    /// A flush already in flight is not aborted, but it will no longer
    /// clear anything when it completes.
    pub fn drop_events(&self) {
        let dropped = self.lock_pending().discard();
        tracing::debug!(dropped, "pending events dropped");
    }

    /// Posts the pending batch to the collector.
    ///
    /// In [`FlushMode::Sync`] this waits for the answer and returns the
    /// outcome. In [`FlushMode::Async`] the request runs on a spawned task
    /// and `None` is returned straight away; observe the result through the
    /// callbacks. Must be called from within a tokio runtime.
    pub async fn flush(self: &Arc<Self>, mode: FlushMode) -> Option<FlushOutcome> {
        match mode {
            FlushMode::Sync => Some(self.deliver().await),
            FlushMode::Async => {
                let dispatcher = Arc::clone(self);
                tokio::spawn(async move { dispatcher.deliver().await });
                None
            }
        }
    }

    async fn deliver(&self) -> FlushOutcome {
        let (body, count, end) = {
            let pending = self.lock_pending();
            match pending.batch.serialize(self.clock.now()) {
                Ok(body) => (body, pending.batch.len(), pending.tail()),
                Err(err) => {
                    drop(pending);
                    tracing::warn!(error = %err, "failed to serialize batch");
                    (self.on_error)();
                    return FlushOutcome::Failed;
                }
            }
        };

        tracing::debug!(endpoint = %self.endpoint, events = count, "flushing batch");

        match self.post(body).await {
            Ok(()) => {
                let removed = self.lock_pending().acknowledge(end);
                tracing::debug!(events = count, removed, "batch delivered");
                (self.on_success)();
                FlushOutcome::Delivered { events: count }
            }
            Err(err) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %err,
                    events = count,
                    "flush failed, batch retained"
                );
                (self.on_error)();
                FlushOutcome::Failed
            }
        }
    }

    async fn post(&self, body: String) -> Result<(), HttpError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        Ok(())
    }

    fn lock_pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Dispatcher for HttpDispatcher {
    fn submit(&self, event: &Event) -> Result<(), TrackerError> {
        let mut pending = self.lock_pending();
        pending.batch.add_event(event)?;
        tracing::debug!(tag = event.tag(), pending = pending.batch.len(), "event queued");
        Ok(())
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, HttpError> {
    let invalid = |reason: String| HttpError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    if endpoint.trim().is_empty() {
        return Err(invalid("endpoint cannot be empty".to_string()));
    }
    let url = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}
