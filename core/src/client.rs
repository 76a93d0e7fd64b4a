//! Public client facade.
//!
//! # Design
//! A single engine exposes both operations: `send` is a batch of one run
//! through the same executor as `send_many`. The client holds the transport,
//! default options and the response/stream factories; it carries no state
//! between calls, and every call builds and tears down its own execution
//! context.

use std::sync::Arc;

use crate::decode::{DefaultFactory, ResponseDecoder, ResponseFactory, StreamFactory};
use crate::error::{Error, TransportErrorCode};
use crate::executor::{BatchExecutor, JobOutcome};
use crate::http::{HttpRequest, HttpResponse};
use crate::options::{OptionOverrides, RequestOptions};
use crate::transport::{Http1Transport, Transport};

/// Asynchronous HTTP client issuing one or many requests concurrently.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    options: RequestOptions,
    responses: Arc<dyn ResponseFactory>,
    streams: Arc<dyn StreamFactory>,
}

impl Client {
    /// Client over the built-in HTTP/1.1 transport with default options.
    pub fn new() -> Self {
        Self::with_transport(Http1Transport::new())
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            options: RequestOptions::default(),
            responses: Arc::new(DefaultFactory),
            streams: Arc::new(DefaultFactory),
        }
    }

    /// Replace the client-level default options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_factories(
        mut self,
        responses: impl ResponseFactory + 'static,
        streams: impl StreamFactory + 'static,
    ) -> Self {
        self.responses = Arc::new(responses);
        self.streams = Arc::new(streams);
        self
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Send one request.
    ///
    /// Non-2xx statuses are returned as responses; only transport failures
    /// are errors.
    pub async fn send(&self, request: &HttpRequest, overrides: &OptionOverrides) -> Result<HttpResponse, Error> {
        self.send_many(std::slice::from_ref(request), overrides)
            .await?
            .pop()
            .ok_or_else(|| Error::Client {
                code: TransportErrorCode::FailedInit,
                message: "batch of one returned no response".to_string(),
            })
    }

    /// Send every request concurrently; responses are index-aligned with
    /// `requests`.
    ///
    /// All-or-nothing: every job runs to completion, then the first failure
    /// in submission order is returned and the other responses are dropped.
    pub async fn send_many(
        &self,
        requests: &[HttpRequest],
        overrides: &OptionOverrides,
    ) -> Result<Vec<HttpResponse>, Error> {
        self.send_all(requests, overrides).await.into_iter().collect()
    }

    /// Send every request concurrently and return one outcome per request,
    /// so a failed job does not discard its siblings' responses.
    pub async fn send_all(&self, requests: &[HttpRequest], overrides: &OptionOverrides) -> Vec<JobOutcome> {
        let options = self.options.merged(overrides);
        let decoder = ResponseDecoder::new(self.responses.as_ref(), self.streams.as_ref());
        BatchExecutor::new(self.transport.as_ref(), decoder)
            .execute(requests, &options)
            .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
