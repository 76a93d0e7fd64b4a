//! Response decoding.
//!
//! A finished job hands back the raw transport output: the header block and
//! the body concatenated, plus the size of the header block. The decoder
//! splits the two, parses header lines, and assembles an `HttpResponse`
//! through the injected factories.

use bytes::Bytes;

use crate::error::Error;
use crate::http::{Body, HttpResponse};

/// Creates blank responses for a status code.
pub trait ResponseFactory: Send + Sync {
    fn create_response(&self, status: u16) -> HttpResponse;
}

/// Wraps body bytes into a body stream.
pub trait StreamFactory: Send + Sync {
    fn create_stream(&self, bytes: Bytes) -> Body;
}

/// Factory producing plain `HttpResponse` / `Body` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl ResponseFactory for DefaultFactory {
    fn create_response(&self, status: u16) -> HttpResponse {
        HttpResponse::new(status)
    }
}

impl StreamFactory for DefaultFactory {
    fn create_stream(&self, bytes: Bytes) -> Body {
        Body::from(bytes)
    }
}

/// Parse a raw header block into `(name, value)` pairs in order.
///
/// Lines are split on CRLF. Empty lines and lines without a colon (status
/// lines included) are skipped. Names and values are trimmed; repeated names
/// are all kept.
pub fn parse_header_block(block: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(block);
    text.split("\r\n")
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Builds responses from raw transport output.
pub struct ResponseDecoder<'a> {
    responses: &'a dyn ResponseFactory,
    streams: &'a dyn StreamFactory,
}

impl<'a> ResponseDecoder<'a> {
    pub fn new(responses: &'a dyn ResponseFactory, streams: &'a dyn StreamFactory) -> Self {
        Self { responses, streams }
    }

    /// Decode one response.
    ///
    /// Fails with [`Error::Response`] when `header_size` points past the end
    /// of `raw`.
    pub fn decode(&self, status: u16, header_size: usize, raw: &Bytes) -> Result<HttpResponse, Error> {
        if header_size > raw.len() {
            return Err(Error::Response(format!(
                "header block size {header_size} exceeds response length {}",
                raw.len()
            )));
        }

        let headers = parse_header_block(&raw[..header_size]);
        let body = self.streams.create_stream(raw.slice(header_size..));

        let response = self.responses.create_response(status).with_body(body);
        Ok(headers
            .into_iter()
            .fold(response, |resp, (name, value)| resp.with_added_header(name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> ResponseDecoder<'static> {
        ResponseDecoder::new(&DefaultFactory, &DefaultFactory)
    }

    fn raw(header: &str, body: &str) -> (usize, Bytes) {
        (header.len(), Bytes::from(format!("{header}{body}")))
    }

    #[test]
    fn splits_header_block_from_body() {
        let (size, bytes) = raw("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n", "hello");
        let resp = decoder().decode(200, size, &bytes).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, Body::from("hello"));
        assert_eq!(resp.headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn repeated_names_keep_every_value() {
        let block = b"Content-Type: text/plain\r\nX-Custom: a\r\nX-Custom: b\r\n";
        let parsed = parse_header_block(block);
        assert_eq!(parsed.len(), 3);

        let (size, bytes) = raw(std::str::from_utf8(block).unwrap(), "");
        let resp = decoder().decode(200, size, &bytes).unwrap();
        assert_eq!(resp.headers.get_all("X-Custom"), vec!["a", "b"]);
        assert_eq!(resp.headers.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn garbage_and_empty_lines_are_skipped() {
        let parsed = parse_header_block(b"garbage-line\r\n\r\nX-Ok: 1\r\n");
        assert_eq!(parsed, vec![("X-Ok".to_string(), "1".to_string())]);
    }

    #[test]
    fn empty_value_is_kept() {
        let parsed = parse_header_block(b"X-Empty:\r\n");
        assert_eq!(parsed, vec![("X-Empty".to_string(), String::new())]);
    }

    #[test]
    fn value_splits_on_first_colon_only() {
        let parsed = parse_header_block(b"Location:  http://example.com:8080/x \r\n");
        assert_eq!(parsed[0].1, "http://example.com:8080/x");
    }

    #[test]
    fn zero_header_size_means_body_only() {
        let bytes = Bytes::from_static(b"just body");
        let resp = decoder().decode(204, 0, &bytes).unwrap();
        assert!(resp.headers.is_empty());
        assert_eq!(resp.text(), "just body");
    }

    #[test]
    fn header_size_past_end_is_response_error() {
        let bytes = Bytes::from_static(b"short");
        let err = decoder().decode(200, 99, &bytes).unwrap_err();
        assert!(matches!(err, Error::Response(_)));
    }

    #[test]
    fn decoding_twice_gives_equal_responses() {
        let (size, bytes) = raw("X-A: 1\r\nX-A: 2\r\n\r\n", "body");
        let first = decoder().decode(201, size, &bytes).unwrap();
        let second = decoder().decode(201, size, &bytes).unwrap();
        assert_eq!(first, second);
    }

    struct TaggingFactory;

    impl ResponseFactory for TaggingFactory {
        fn create_response(&self, status: u16) -> HttpResponse {
            HttpResponse::new(status).with_added_header("X-Factory", "tagging")
        }
    }

    #[test]
    fn injected_factory_is_used() {
        let decoder = ResponseDecoder::new(&TaggingFactory, &DefaultFactory);
        let (size, bytes) = raw("X-A: 1\r\n\r\n", "");
        let resp = decoder.decode(200, size, &bytes).unwrap();
        assert_eq!(resp.headers.names(), vec!["X-Factory", "X-A"]);
    }
}
