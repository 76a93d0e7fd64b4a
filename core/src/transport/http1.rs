//! HTTP/1.1 transport over plain TCP.
//!
//! One connection per exchange (`Connection: close`), no pooling across
//! calls. Interim `1xx` header blocks and redirect hops stay in the returned
//! header block, so the header block size covers every block received.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::{Host, Url};

use super::{RawResult, Transport, WireRequest};
use crate::codec;
use crate::error::TransportErrorCode;
use crate::http::Body;
use crate::options::RequestOptions;

/// Safety cap on redirect hops.
const MAX_REDIRECTS: usize = 30;

const READ_CHUNK: usize = 8 * 1024;

/// Largest single response header block accepted.
const MAX_HEADER_SIZE: usize = 100 * 1024;

/// Production transport: HTTP/1.1 over `tokio::net::TcpStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Http1Transport;

impl Http1Transport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for Http1Transport {
    fn perform<'a>(
        &'a self,
        wire: &'a WireRequest,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, RawResult> {
        Box::pin(async move {
            match exchange(wire, options).await {
                Ok(result) => result,
                Err(failure) => RawResult::Failed {
                    code: failure.code,
                    message: failure.message,
                },
            }
        })
    }
}

#[derive(Debug)]
struct Failure {
    code: TransportErrorCode,
    message: String,
}

impl Failure {
    fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One request/response round trip on a fresh connection.
struct Exchange {
    status: u16,
    header_block: Bytes,
    body: Bytes,
    location: Option<String>,
}

async fn exchange(wire: &WireRequest, options: &RequestOptions) -> Result<RawResult, Failure> {
    let mut url = parse_url(&wire.uri)?;
    let mut verb = wire.verb;
    let mut lines = wire.header_lines.clone();
    let mut body = wire.body.clone();
    let mut header_blocks = BytesMut::new();
    let mut hops = 0;

    loop {
        let reply = round_trip(&url, verb, &lines, body.as_ref(), options).await?;
        header_blocks.extend_from_slice(&reply.header_block);

        let redirect = options.follow_redirects && is_redirect(reply.status);
        if let (true, Some(location)) = (redirect, reply.location.as_deref()) {
            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(Failure::new(
                    TransportErrorCode::TooManyRedirects,
                    format!("maximum ({MAX_REDIRECTS}) redirects followed"),
                ));
            }
            let next = url.join(location).map_err(|e| {
                Failure::new(
                    TransportErrorCode::UrlMalformat,
                    format!("bad redirect location {location:?}: {e}"),
                )
            })?;
            if next.origin() != url.origin() {
                lines.retain(|l| !is_origin_bound(l));
            }
            url = next;
            if switches_to_get(reply.status, verb) {
                verb = "GET";
                body = None;
                lines.retain(|l| {
                    !codec::split_line(l).is_some_and(|(n, _)| n.eq_ignore_ascii_case("content-length"))
                });
            }
            tracing::trace!(status = reply.status, %url, hop = hops, "following redirect");
            continue;
        }

        let header_blocks = header_blocks.freeze();
        return Ok(if options.include_headers {
            let mut raw = BytesMut::with_capacity(header_blocks.len() + reply.body.len());
            raw.extend_from_slice(&header_blocks);
            raw.extend_from_slice(&reply.body);
            RawResult::Complete {
                status: reply.status,
                header_size: header_blocks.len(),
                raw: raw.freeze(),
            }
        } else {
            RawResult::Complete {
                status: reply.status,
                header_size: 0,
                raw: reply.body,
            }
        });
    }
}

fn parse_url(uri: &str) -> Result<Url, Failure> {
    let url = Url::parse(uri).map_err(|e| {
        Failure::new(TransportErrorCode::UrlMalformat, format!("malformed URL {uri:?}: {e}"))
    })?;
    match url.scheme() {
        "http" => Ok(url),
        other => Err(Failure::new(
            TransportErrorCode::UnsupportedProtocol,
            format!("protocol {other:?} not supported"),
        )),
    }
}

/// Lines that must not follow a redirect to another scheme, host or port.
fn is_origin_bound(line: &str) -> bool {
    codec::split_line(line).is_some_and(|(name, _)| {
        ["authorization", "cookie", "host"]
            .iter()
            .any(|bound| name.eq_ignore_ascii_case(bound))
    })
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// 303 always becomes GET; 301/302 turn a POST into GET.
fn switches_to_get(status: u16, verb: &str) -> bool {
    status == 303 || (matches!(status, 301 | 302) && verb == "POST")
}

async fn round_trip(
    url: &Url,
    verb: &str,
    lines: &[String],
    body: Option<&Body>,
    options: &RequestOptions,
) -> Result<Exchange, Failure> {
    let request = serialize_request(url, verb, lines, body, options)?;
    let mut stream = connect(url, options.connect_timeout()).await?;

    stream
        .write_all(&request)
        .await
        .map_err(|e| Failure::new(TransportErrorCode::SendError, format!("failed sending data: {e}")))?;

    ResponseReader::new(stream).read_exchange().await
}

fn host_port(url: &Url) -> Result<(String, u16), Failure> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => {
            return Err(Failure::new(
                TransportErrorCode::UrlMalformat,
                format!("no host in URL {url}"),
            ))
        }
    };
    Ok((host, url.port_or_known_default().unwrap_or(80)))
}

async fn connect(url: &Url, deadline: Option<Duration>) -> Result<TcpStream, Failure> {
    let (host, port) = host_port(url)?;
    let attempt = connect_any(&host, port);
    match deadline {
        Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
            Failure::new(
                TransportErrorCode::OperationTimedOut,
                format!("connection timed out after {} ms", limit.as_millis()),
            )
        })?,
        None => attempt.await,
    }
}

async fn connect_any(host: &str, port: u16) -> Result<TcpStream, Failure> {
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        Failure::new(
            TransportErrorCode::CouldntResolveHost,
            format!("could not resolve host {host}: {e}"),
        )
    })?;

    let mut last_error = None;
    for addr in addrs {
        tracing::trace!(%addr, "connecting");
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(match last_error {
        Some(e) => Failure::new(
            TransportErrorCode::CouldntConnect,
            format!("failed to connect to {host} port {port}: {e}"),
        ),
        None => Failure::new(
            TransportErrorCode::CouldntResolveHost,
            format!("could not resolve host {host}: no addresses"),
        ),
    })
}

fn serialize_request(
    url: &Url,
    verb: &str,
    lines: &[String],
    body: Option<&Body>,
    options: &RequestOptions,
) -> Result<Vec<u8>, Failure> {
    if let Some(bad) = lines
        .iter()
        .find(|l| l.contains(['\r', '\n']) || codec::split_line(l).is_none())
    {
        return Err(Failure::new(
            TransportErrorCode::BadFunctionArgument,
            format!("invalid header line {bad:?}"),
        ));
    }

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut head = format!("{verb} {target} HTTP/1.1\r\n");
    if !codec::has_header(lines, "Host") {
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => head.push_str(&format!("Host: {host}:{port}\r\n")),
            None => head.push_str(&format!("Host: {host}\r\n")),
        }
    }
    if !codec::has_header(lines, "User-Agent") && !options.user_agent.is_empty() {
        head.push_str(&format!("User-Agent: {}\r\n", options.user_agent));
    }
    if let Some(encoding) = &options.encoding {
        if !codec::has_header(lines, "Accept-Encoding") {
            head.push_str(&format!("Accept-Encoding: {encoding}\r\n"));
        }
    }
    for line in lines {
        head.push_str(line);
        head.push_str("\r\n");
    }
    let chunked = body.is_some_and(|b| b.size().is_none());
    if chunked {
        head.push_str("Transfer-Encoding: chunked\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");

    let mut out = head.into_bytes();
    match body {
        Some(Body::Bytes(bytes)) => out.extend_from_slice(bytes),
        Some(Body::Chunked(chunks)) => {
            for chunk in chunks.iter().filter(|c| !c.is_empty()) {
                out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                out.extend_from_slice(chunk);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
        }
        Some(Body::Empty) | None => {}
    }
    Ok(out)
}

/// Status and framing facts from one response header block.
#[derive(Debug, PartialEq, Eq)]
struct Head {
    status: u16,
    content_length: Option<usize>,
    chunked: bool,
    location: Option<String>,
}

fn parse_head(block: &[u8]) -> Option<Head> {
    // Header values and reason phrases may carry obs-text bytes.
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");

    // Status line: HTTP/1.1 200 OK
    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let status: u16 = parts.next()?.parse().ok()?;

    let mut head = Head {
        status,
        content_length: None,
        chunked: false,
        location: None,
    };
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            head.chunked = value
                .rsplit(',')
                .next()
                .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
        } else if name.eq_ignore_ascii_case("location") {
            head.location = Some(value.to_string());
        }
    }
    Some(head)
}

/// Index just past the `\r\n\r\n` that ends a header block, searching
/// from `from` onwards.
fn find_header_end(data: &[u8], from: usize) -> Option<usize> {
    let from = from.min(data.len());
    data[from..]
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| from + i + 4)
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

enum Chunk {
    Data { start: usize, end: usize, consumed: usize },
    Last,
    NeedMore,
    Malformed,
}

/// Decode the next chunk header in chunked transfer coding.
fn next_chunk(data: &[u8]) -> Chunk {
    let Some(crlf) = find_crlf(data) else {
        return Chunk::NeedMore;
    };
    let Ok(size_line) = std::str::from_utf8(&data[..crlf]) else {
        return Chunk::Malformed;
    };
    // Strip chunk extensions (;key=value).
    let size_hex = size_line.split(';').next().unwrap_or("").trim();
    let Ok(size) = usize::from_str_radix(size_hex, 16) else {
        return Chunk::Malformed;
    };
    if size == 0 {
        return Chunk::Last;
    }

    let start = crlf + 2;
    // Sizes come from the peer; an overflowing one can never be satisfied.
    let Some((end, consumed)) = start
        .checked_add(size)
        .and_then(|end| end.checked_add(2).map(|consumed| (end, consumed)))
    else {
        return Chunk::Malformed;
    };
    if data.len() < consumed {
        return Chunk::NeedMore;
    }
    if &data[end..consumed] != b"\r\n" {
        return Chunk::Malformed;
    }
    Chunk::Data { start, end, consumed }
}

fn header_too_large() -> Failure {
    Failure::new(
        TransportErrorCode::RecvError,
        format!("response header block exceeds {MAX_HEADER_SIZE} bytes"),
    )
}

struct ResponseReader {
    stream: TcpStream,
    buf: BytesMut,
}

impl ResponseReader {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Read more bytes into the buffer. Returns 0 at end of stream.
    async fn fill(&mut self) -> Result<usize, Failure> {
        self.buf.reserve(READ_CHUNK);
        self.stream.read_buf(&mut self.buf).await.map_err(|e| {
            Failure::new(TransportErrorCode::RecvError, format!("failure when receiving data: {e}"))
        })
    }

    async fn read_exchange(mut self) -> Result<Exchange, Failure> {
        let mut header_block = BytesMut::new();
        let head = loop {
            let (block, head) = self.read_head().await?;
            header_block.extend_from_slice(&block);
            // 101 hands the connection over; there is no final response to wait for.
            if (100..200).contains(&head.status) && head.status != 101 {
                continue;
            }
            break head;
        };

        let body = if matches!(head.status, 100..=199 | 204 | 304) {
            Bytes::new()
        } else if head.chunked {
            self.read_chunked().await?
        } else if let Some(len) = head.content_length {
            self.read_exact_len(len).await?
        } else {
            self.read_to_end().await?
        };

        Ok(Exchange {
            status: head.status,
            header_block: header_block.freeze(),
            body,
            location: head.location,
        })
    }

    async fn read_head(&mut self) -> Result<(Bytes, Head), Failure> {
        let mut scanned = 0;
        loop {
            if let Some(end) = find_header_end(&self.buf, scanned) {
                if end > MAX_HEADER_SIZE {
                    return Err(header_too_large());
                }
                let block = self.buf.split_to(end).freeze();
                let head = parse_head(&block).ok_or_else(|| {
                    Failure::new(TransportErrorCode::WeirdServerReply, "malformed response status line")
                })?;
                return Ok((block, head));
            }
            if self.buf.len() > MAX_HEADER_SIZE {
                return Err(header_too_large());
            }
            // The terminator may straddle the next read.
            scanned = self.buf.len().saturating_sub(3);
            if self.fill().await? == 0 {
                return Err(if self.buf.is_empty() {
                    Failure::new(TransportErrorCode::GotNothing, "empty reply from server")
                } else {
                    Failure::new(
                        TransportErrorCode::WeirdServerReply,
                        "connection closed inside the response header block",
                    )
                });
            }
        }
    }

    async fn read_exact_len(&mut self, len: usize) -> Result<Bytes, Failure> {
        while self.buf.len() < len {
            if self.fill().await? == 0 {
                return Err(Failure::new(
                    TransportErrorCode::RecvError,
                    format!("transfer closed with {} bytes remaining", len - self.buf.len()),
                ));
            }
        }
        Ok(self.buf.split_to(len).freeze())
    }

    async fn read_to_end(&mut self) -> Result<Bytes, Failure> {
        while self.fill().await? > 0 {}
        Ok(self.buf.split().freeze())
    }

    async fn read_chunked(&mut self) -> Result<Bytes, Failure> {
        let mut decoded = BytesMut::new();
        loop {
            match next_chunk(&self.buf) {
                Chunk::Data { start, end, consumed } => {
                    decoded.extend_from_slice(&self.buf[start..end]);
                    let _ = self.buf.split_to(consumed);
                }
                Chunk::Last => return Ok(decoded.freeze()),
                Chunk::Malformed => {
                    return Err(Failure::new(
                        TransportErrorCode::RecvError,
                        "malformed chunked transfer coding",
                    ))
                }
                Chunk::NeedMore => {
                    if self.fill().await? == 0 {
                        return Err(Failure::new(
                            TransportErrorCode::RecvError,
                            "transfer closed inside chunked body",
                        ));
                    }
                }
            }
        }
    }
}
