//! Concurrent batch execution.
//!
//! # Design
//! One `execute` call owns its own execution context: a `FuturesUnordered`
//! holding one in-flight transport future per job. Every job is dispatched
//! before the first poll, and the calling task then drives all of them
//! cooperatively, parking until any job makes progress. No threads are
//! spawned and nothing is shared between calls.
//!
//! Completion order is arbitrary; each job carries its submission index and
//! its outcome is written into that slot, so the returned outcomes are always
//! in request order. Each job's future (its transport handle) is dropped the
//! moment it reaches a terminal state. The context itself is dropped only
//! after every job is terminal.

use std::fmt;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::codec;
use crate::decode::ResponseDecoder;
use crate::error::{Error, TransportErrorCode};
use crate::http::{HttpRequest, HttpResponse};
use crate::method;
use crate::options::RequestOptions;
use crate::transport::{RawResult, Transport, WireRequest};

/// Outcome of one job, in submission order.
pub type JobOutcome = Result<HttpResponse, Error>;

/// Lifecycle of a transport job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Dispatched => "dispatched",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One logical request being executed.
#[derive(Debug)]
pub struct TransportJob {
    /// Correlation key: position of the request in the batch.
    pub index: usize,
    pub wire: WireRequest,
    pub state: JobState,
}

impl TransportJob {
    /// Bind the method and encode headers for `request`.
    pub fn prepare(index: usize, request: &HttpRequest, options: &RequestOptions) -> Self {
        let binding = method::bind(request, options.delete_mode);
        let wire_body = binding.wire_body(request);
        let wire = WireRequest {
            verb: binding.verb(),
            uri: request.uri.clone(),
            header_lines: codec::encode(request, wire_body),
            body: wire_body.cloned(),
        };
        Self {
            index,
            wire,
            state: JobState::Pending,
        }
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(!self.state.is_terminal(), "job {} already {}", self.index, self.state);
        self.state = next;
    }
}

/// Drives batches of requests through a transport.
pub struct BatchExecutor<'a> {
    transport: &'a dyn Transport,
    decoder: ResponseDecoder<'a>,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(transport: &'a dyn Transport, decoder: ResponseDecoder<'a>) -> Self {
        Self { transport, decoder }
    }

    /// Run every request to a terminal state and return one outcome per
    /// request, index-aligned with `requests`.
    pub async fn execute(&self, requests: &[HttpRequest], options: &RequestOptions) -> Vec<JobOutcome> {
        let span = tracing::debug_span!("batch", batch_id = %Uuid::new_v4(), size = requests.len());
        self.run(requests, options).instrument(span).await
    }

    async fn run(&self, requests: &[HttpRequest], options: &RequestOptions) -> Vec<JobOutcome> {
        let mut jobs: Vec<TransportJob> = requests
            .iter()
            .enumerate()
            .map(|(index, request)| TransportJob::prepare(index, request, options))
            .collect();

        let mut outcomes: Vec<Option<JobOutcome>> = (0..jobs.len()).map(|_| None).collect();
        let started = Instant::now();

        {
            let mut in_flight = FuturesUnordered::new();
            for job in &mut jobs {
                tracing::debug!(index = job.index, verb = job.wire.verb, uri = %job.wire.uri, "dispatching job");
                in_flight.push(perform(self.transport, job.index, job.wire.clone(), options));
                job.advance(JobState::Dispatched);
            }

            while let Some((index, raw)) = in_flight.next().await {
                let elapsed = started.elapsed();
                let job = &mut jobs[index];
                let outcome = match raw {
                    RawResult::Complete {
                        status,
                        header_size,
                        raw,
                    } => {
                        job.advance(JobState::Completed);
                        tracing::debug!(index, status, ?elapsed, "job completed");
                        self.decoder.decode(status, header_size, &raw)
                    }
                    RawResult::Failed { code, message } => {
                        job.advance(JobState::Failed);
                        tracing::warn!(index, %code, %message, ?elapsed, "job failed");
                        Err(Error::from_transport(code, message))
                    }
                };
                outcomes[index] = Some(outcome);
            }
        }

        outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    Err(Error::Client {
                        code: TransportErrorCode::FailedInit,
                        message: format!("job {index} never reached a terminal state"),
                    })
                })
            })
            .collect()
    }
}

/// Run one job under its deadline, tagged with its index. The returned
/// future owns the job's wire request and is the job's transport handle.
async fn perform(
    transport: &dyn Transport,
    index: usize,
    wire: WireRequest,
    options: &RequestOptions,
) -> (usize, RawResult) {
    let raw = match options.timeout() {
        Some(limit) => tokio::time::timeout(limit, transport.perform(&wire, options))
            .await
            .unwrap_or_else(|_| timed_out(limit)),
        None => transport.perform(&wire, options).await,
    };
    (index, raw)
}

fn timed_out(limit: Duration) -> RawResult {
    RawResult::failed(
        TransportErrorCode::OperationTimedOut,
        format!("operation timed out after {} ms", limit.as_millis()),
    )
}
