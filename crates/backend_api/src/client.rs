use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use crate::config::BackendRegistry;
use crate::error::BackendApiError;
use crate::events::{EventHandler, FailureReason, StreamEvent};
use crate::request::{build_request, AskOptions, ResolvedRequest};
use crate::sse::{extract_delta, SseLineDecoder};

/// Shared cancellation signal for one in-flight job.
pub type CancelSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Streaming client over the configured backend registry.
///
/// `ask` normalizes both provider families into the [`StreamEvent`] contract:
/// exactly one `Started` before any data, deltas in wire order, and exactly
/// one terminal event. All events for a job are delivered from a single
/// spawned task, so callbacks are never invoked concurrently.
#[derive(Debug)]
pub struct BackendClient {
    http: Client,
    registry: BackendRegistry,
}

/// Handle to one in-flight request.
#[derive(Debug)]
pub struct Job {
    cancel: CancelSignal,
    handle: tokio::task::JoinHandle<()>,
}

impl Job {
    /// Requests cancellation. The signal is set synchronously; the transport
    /// abort is best-effort and the streaming task discards anything that
    /// arrives after the signal.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Waits for the streaming task to finish delivering its terminal event.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

impl BackendClient {
    pub fn new(registry: BackendRegistry) -> Result<Self, BackendApiError> {
        let http = Client::builder().build().map_err(BackendApiError::from)?;
        Ok(Self { http, registry })
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BackendRegistry {
        &mut self.registry
    }

    /// Starts one streaming request.
    ///
    /// Configuration problems (unknown backend or model, nothing selected)
    /// fail synchronously before any event fires; everything after that is
    /// reported through the event stream.
    pub fn ask(&self, opts: AskOptions, on_event: EventHandler) -> Result<Job, BackendApiError> {
        let (profile, model) = self
            .registry
            .resolve(opts.backend.as_deref(), opts.model.as_deref())?;
        let request = build_request(profile, &model, &opts)?;

        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        let task_cancel = cancel.clone();
        let http = self.http.clone();
        let mut on_event = on_event;

        let handle = tokio::spawn(async move {
            on_event(StreamEvent::Started {
                backend: request.backend.clone(),
                model: request.model.clone(),
                temperature: request.temperature,
            });
            let terminal = run_stream(&http, &request, &task_cancel, &mut on_event).await;
            on_event(terminal);
        });

        Ok(Job { cancel, handle })
    }
}

async fn run_stream(
    http: &Client,
    request: &ResolvedRequest,
    cancel: &CancelSignal,
    on_event: &mut EventHandler,
) -> StreamEvent {
    let mut builder = http.post(&request.url).json(&request.body);
    for (key, value) in &request.headers {
        builder = builder.header(*key, value);
    }

    let response = match await_or_cancel(builder.send(), cancel).await {
        Err(reason) => return StreamEvent::Failed { reason },
        Ok(Err(error)) => {
            return StreamEvent::Failed {
                reason: FailureReason::Transport(error.to_string()),
            }
        }
        Ok(Ok(response)) => response,
    };

    let status = response.status().as_u16();
    if status >= 400 {
        // Error statuses are a completed-with-body outcome so callers can
        // render the provider's error payload.
        let body = match await_or_cancel(response.text(), cancel).await {
            Err(reason) => return StreamEvent::Failed { reason },
            Ok(body) => body.unwrap_or_default(),
        };
        return StreamEvent::Completed { status, body };
    }

    let mut bytes = response.bytes_stream();
    let mut decoder = SseLineDecoder::default();
    let mut body = String::new();

    loop {
        let chunk = match await_or_cancel(bytes.next(), cancel).await {
            Err(reason) => return StreamEvent::Failed { reason },
            Ok(None) => break,
            Ok(Some(Err(error))) => {
                return StreamEvent::Failed {
                    reason: FailureReason::Transport(error.to_string()),
                }
            }
            Ok(Some(Ok(chunk))) => chunk,
        };
        // A final chunk may race the abort; discard it instead of emitting.
        if is_cancelled(cancel) {
            return StreamEvent::Failed {
                reason: FailureReason::Cancelled,
            };
        }

        for line in decoder.feed(&chunk) {
            let delta = extract_delta(&line);
            if !delta.is_empty() {
                body.push_str(&delta);
                on_event(StreamEvent::Delta { text: delta });
            }
        }
    }

    if is_cancelled(cancel) {
        return StreamEvent::Failed {
            reason: FailureReason::Cancelled,
        };
    }

    StreamEvent::Completed { status, body }
}

fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

async fn await_or_cancel<F>(future: F, cancel: &CancelSignal) -> Result<F::Output, FailureReason>
where
    F: Future,
{
    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancel) {
            return Err(FailureReason::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancel) {
                return Err(FailureReason::Cancelled);
            }
            return Ok(output);
        }
    }
}
