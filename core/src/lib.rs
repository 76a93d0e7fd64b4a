//! Concurrent HTTP batch client.
//!
//! # Overview
//! Issues one or many HTTP requests concurrently and turns every transport
//! outcome into either an `HttpResponse` or a typed `Error`. A batch of N
//! requests always yields N outcomes, in request order, whatever order the
//! transport completes them in.
//!
//! # Design
//! - `Client::send` is a batch of one through the same `BatchExecutor` as
//!   `Client::send_many`.
//! - The executor binds each request's method (`method`), encodes its
//!   headers (`codec`), runs every job concurrently on the calling task, and
//!   decodes raw transport output (`decode`) or classifies failures (`error`).
//! - `Transport` is the seam to the network. `Http1Transport` speaks plain
//!   HTTP/1.1 over tokio; tests plug in scripted transports.
//! - `send_many` is all-or-nothing; `send_all` returns one `Result` per
//!   request.

pub mod blocking;
pub mod client;
pub mod codec;
pub mod decode;
pub mod error;
pub mod executor;
pub mod http;
pub mod method;
pub mod options;
pub mod transport;

pub use client::Client;
pub use decode::{DefaultFactory, ResponseDecoder, ResponseFactory, StreamFactory};
pub use error::{classify, Error, ErrorKind, NetworkFailure, TransportErrorCode};
pub use executor::{BatchExecutor, JobOutcome, JobState, TransportJob};
pub use http::{Body, Headers, HttpMethod, HttpRequest, HttpResponse};
pub use method::{Binding, Directive};
pub use options::{DeleteMode, OptionOverrides, RequestOptions};
pub use transport::{Http1Transport, RawResult, Transport, WireRequest};
