//! Request header encoding.
//!
//! Turns a request's header multimap into the `Name: value` lines the
//! transport writes, one line per distinct name, and fills in
//! `Content-Length` for bodies of known size.

use crate::http::{Body, HttpRequest};

const CONTENT_LENGTH: &str = "Content-Length";

/// Encode `request`'s headers for the wire.
///
/// `wire_body` is the body actually attached (see [`crate::method::Binding`]).
/// A caller-supplied `Content-Length` is dropped in favor of the computed one,
/// and omitted entirely when no body is attached or its size is unknown.
pub fn encode(request: &HttpRequest, wire_body: Option<&Body>) -> Vec<String> {
    let mut lines: Vec<String> = request
        .headers
        .names()
        .into_iter()
        .filter(|name| !name.eq_ignore_ascii_case(CONTENT_LENGTH))
        .map(|name| format!("{name}: {}", request.headers.header_line(name)))
        .collect();

    if let Some(len) = wire_body.and_then(Body::size) {
        lines.push(format!("{CONTENT_LENGTH}: {len}"));
    }
    lines
}

/// Split an encoded line back into name and value.
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(':').map(|(n, v)| (n.trim(), v.trim()))
}

/// True if any encoded line sets `name`.
pub fn has_header(lines: &[String], name: &str) -> bool {
    lines
        .iter()
        .filter_map(|l| split_line(l))
        .any(|(n, _)| n.eq_ignore_ascii_case(name))
}
