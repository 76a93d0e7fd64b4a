//! Logical request/response model consumed and produced by the batch engine.
//!
//! # Design
//! These types describe HTTP messages as plain data, independent of any wire
//! details. The engine only ever reads an `HttpRequest`; the caller keeps
//! ownership of it and may resubmit it. An `HttpResponse` is built once per
//! successful job and handed over to the caller.
//!
//! Header names keep the spelling they were given but compare
//! case-insensitively, so `Content-Type` and `content-type` are one header.

use std::borrow::Cow;
use std::fmt;

use bytes::{Bytes, BytesMut};

/// HTTP method of a logical request.
///
/// Parsing is case-insensitive and always normalizes to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Any other verb, stored uppercase.
    Other(String),
}

impl HttpMethod {
    pub fn parse(method: &str) -> Self {
        let upper = method.trim().to_ascii_uppercase();
        match upper.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            _ => HttpMethod::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Other(verb) => verb,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HttpMethod {
    fn from(s: &str) -> Self {
        HttpMethod::parse(s)
    }
}

/// Ordered header multimap.
///
/// Values for one name keep their insertion order. Distinct names are
/// reported in the order they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `name`, keeping any existing values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every value under `name` with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Remove every value under `name`. Returns true if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    /// First value recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The values under `name` flattened into one comma-separated line.
    ///
    /// Returns an empty string when the header is absent.
    pub fn header_line(&self, name: &str) -> String {
        self.get_all(name).join(", ")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Each distinct header name once, spelled as first inserted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of `(name, value)` pairs, counting repeated names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Body of known length.
    Bytes(Bytes),
    /// Body whose length is not advertised up front. Sent with chunked
    /// transfer coding, one chunk per element.
    Chunked(Vec<Bytes>),
}

impl Body {
    /// Byte length if it is known before sending.
    pub fn size(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(b) => Some(b.len() as u64),
            Body::Chunked(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(b) => b.is_empty(),
            Body::Chunked(chunks) => chunks.iter().all(|c| c.is_empty()),
        }
    }

    /// The whole body as one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Bytes(b) => b.clone(),
            Body::Chunked(chunks) => {
                let mut buf = BytesMut::new();
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::from(Bytes::from(v))
    }
}

impl From<&[u8]> for Body {
    fn from(s: &[u8]) -> Self {
        Body::from(Bytes::copy_from_slice(s))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        if b.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(b)
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::from(s.as_bytes())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::from(s.into_bytes())
    }
}

/// A logical HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: Headers,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: impl Into<HttpMethod>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, uri)
    }

    pub fn post(uri: impl Into<String>, body: impl Into<Body>) -> Self {
        Self::new(HttpMethod::Post, uri).with_body(body)
    }

    pub fn put(uri: impl Into<String>, body: impl Into<Body>) -> Self {
        Self::new(HttpMethod::Put, uri).with_body(body)
    }

    pub fn patch(uri: impl Into<String>, body: impl Into<Body>) -> Self {
        Self::new(HttpMethod::Patch, uri).with_body(body)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, uri)
    }

    /// Add a header value, keeping existing values for the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }
}

/// A logical HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_added_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.body {
            Body::Empty => Cow::Borrowed(""),
            Body::Bytes(b) => String::from_utf8_lossy(b),
            Body::Chunked(_) => Cow::Owned(String::from_utf8_lossy(&self.body.to_bytes()).into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_normalizes_case() {
        assert_eq!(HttpMethod::parse("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("Patch"), HttpMethod::Patch);
        assert_eq!(HttpMethod::parse("purge"), HttpMethod::Other("PURGE".to_string()));
        assert_eq!(HttpMethod::parse("purge").as_str(), "PURGE");
    }

    #[test]
    fn headers_keep_value_order_per_name() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        headers.append("X-Trace", "1");
        headers.append("accept", "application/json");

        assert_eq!(headers.get_all("ACCEPT"), vec!["text/html", "application/json"]);
        assert_eq!(headers.header_line("Accept"), "text/html, application/json");
        assert_eq!(headers.names(), vec!["Accept", "X-Trace"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn headers_insert_replaces_all_values() {
        let mut headers: Headers = [("A", "1"), ("a", "2")].into_iter().collect();
        headers.insert("A", "3");
        assert_eq!(headers.get_all("a"), vec!["3"]);
        assert!(headers.remove("A"));
        assert!(headers.is_empty());
        assert_eq!(headers.header_line("A"), "");
    }

    #[test]
    fn body_size_known_and_unknown() {
        assert_eq!(Body::Empty.size(), Some(0));
        assert_eq!(Body::from("hello").size(), Some(5));
        let chunked = Body::Chunked(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]);
        assert_eq!(chunked.size(), None);
        assert_eq!(chunked.to_bytes(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn empty_input_becomes_empty_body() {
        assert_eq!(Body::from(""), Body::Empty);
        assert_eq!(Body::from(Vec::new()), Body::Empty);
    }

    #[test]
    fn request_builders_set_method_and_body() {
        let req = HttpRequest::post("http://localhost/items", "{}")
            .with_header("Content-Type", "application/json");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.size(), Some(2));
        assert_eq!(req.headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn response_text_is_lossy() {
        let resp = HttpResponse::new(200).with_body(Body::from(vec![b'o', b'k', 0xff]));
        assert_eq!(resp.text(), "ok\u{fffd}");
        assert!(resp.is_success());
        assert!(!HttpResponse::new(404).is_success());
    }
}
