//! Transport boundary.
//!
//! # Design
//! A `Transport` performs one wire exchange per call and reports the outcome
//! as a `RawResult`: either the raw header-block-plus-body bytes with the
//! status and header block size, or a failure code and message. It never
//! decodes responses or raises typed errors; that is the batch executor's job.
//! Many `perform` futures are polled together by one executor task, so an
//! implementation must not block the thread.

mod http1;

pub use http1::Http1Transport;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::TransportErrorCode;
use crate::http::Body;
use crate::options::RequestOptions;

/// One request as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub verb: &'static str,
    pub uri: String,
    /// Encoded `Name: value` lines, without the trailing CRLF.
    pub header_lines: Vec<String>,
    pub body: Option<Body>,
}

/// Raw outcome of one transport job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResult {
    Complete {
        status: u16,
        header_size: usize,
        raw: Bytes,
    },
    Failed {
        code: TransportErrorCode,
        message: String,
    },
}

impl RawResult {
    pub fn failed(code: TransportErrorCode, message: impl Into<String>) -> Self {
        RawResult::Failed {
            code,
            message: message.into(),
        }
    }
}

/// Performs wire exchanges for the batch executor.
pub trait Transport: Send + Sync {
    fn perform<'a>(
        &'a self,
        wire: &'a WireRequest,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, RawResult>;
}
