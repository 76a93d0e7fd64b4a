//! Blocking facade.
//!
//! Owns a current-thread tokio runtime, so a whole batch is driven by the
//! calling thread alone. Must not be used from inside an async context.

use tokio::runtime::{Builder, Runtime};

use crate::error::{Error, TransportErrorCode};
use crate::executor::JobOutcome;
use crate::http::{HttpRequest, HttpResponse};
use crate::options::{OptionOverrides, RequestOptions};
use crate::transport::Transport;

/// Blocking wrapper around [`crate::Client`].
pub struct Client {
    inner: crate::Client,
    runtime: Runtime,
}

impl Client {
    pub fn new() -> Result<Self, Error> {
        Self::from_async(crate::Client::new())
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Result<Self, Error> {
        Self::from_async(crate::Client::with_transport(transport))
    }

    /// Wrap an already configured async client.
    pub fn from_async(inner: crate::Client) -> Result<Self, Error> {
        let runtime = Builder::new_current_thread().enable_all().build().map_err(|e| Error::Client {
            code: TransportErrorCode::FailedInit,
            message: format!("failed to start runtime: {e}"),
        })?;
        Ok(Self { inner, runtime })
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    pub fn options(&self) -> &RequestOptions {
        self.inner.options()
    }

    pub fn send(&self, request: &HttpRequest, overrides: &OptionOverrides) -> Result<HttpResponse, Error> {
        self.runtime.block_on(self.inner.send(request, overrides))
    }

    pub fn send_many(
        &self,
        requests: &[HttpRequest],
        overrides: &OptionOverrides,
    ) -> Result<Vec<HttpResponse>, Error> {
        self.runtime.block_on(self.inner.send_many(requests, overrides))
    }

    pub fn send_all(&self, requests: &[HttpRequest], overrides: &OptionOverrides) -> Vec<JobOutcome> {
        self.runtime.block_on(self.inner.send_all(requests, overrides))
    }
}
