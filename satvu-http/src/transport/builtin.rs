//! Minimal HTTP/1.1 transport over a plain TCP socket.
//!
//! One connection per request with `Connection: close`, so the response is
//! read until the server closes the socket and then parsed. Only `http://`
//! URLs are accepted.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(feature = "telemetry")]
use tracing::trace;

use super::{BoxFuture, PreparedRequest, Transport};
use crate::config::Backend;
use crate::constants::{DEFAULT_USER_AGENT, MAX_RESPONSE_HEAD_BYTES};
use crate::error::HttpError;
use crate::response::Response;

/// Transport that needs nothing beyond the runtime's TCP primitives.
///
/// It has no reusable session: there is no pre-built instance to inject.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTransport {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl BuiltinTransport {
    /// Creates a transport without a timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the whole exchange (connect, write, read) by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the default `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    async fn exchange(&self, request: PreparedRequest) -> Result<Response, HttpError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(request))
                .await
                .map_err(|_| HttpError::Timeout(limit))?,
            None => self.round_trip(request).await,
        }
    }

    async fn round_trip(&self, request: PreparedRequest) -> Result<Response, HttpError> {
        if request.url.scheme() != "http" {
            return Err(HttpError::UnsupportedScheme(request.url.scheme().to_owned()));
        }
        let host = request
            .url
            .host_str()
            .ok_or(HttpError::Url(url::ParseError::EmptyHost))?
            .to_owned();
        let port = request.url.port_or_known_default().unwrap_or(80);

        let head = self.encode_head(&request, &host)?;

        #[cfg(feature = "telemetry")]
        trace!(%host, port, method = %request.method, "Opening connection");

        // IPv6 literals come bracketed from the URL.
        let addr = host.trim_start_matches('[').trim_end_matches(']');
        let mut stream = TcpStream::connect((addr, port)).await?;
        stream.write_all(&head).await?;
        if let Some(body) = &request.body {
            stream.write_all(body).await?;
        }
        stream.flush().await?;

        let raw = read_response(&mut stream).await?;
        parse_response(&raw, &request.method)
    }

    /// Serializes the request line and headers.
    fn encode_head(&self, request: &PreparedRequest, host: &str) -> Result<Vec<u8>, HttpError> {
        let url = &request.url;
        let mut target = url.path().to_owned();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut headers = request.headers.clone();
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        headers.insert(HOST, HeaderValue::from_str(&authority)?);
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        if !headers.contains_key(USER_AGENT) {
            let agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
            headers.insert(USER_AGENT, HeaderValue::from_str(agent)?);
        }
        let body_len = request.body.as_ref().map_or(0, Bytes::len);
        if body_len > 0 || expects_body(&request.method) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body_len));
        }

        let mut head = format!("{} {target} HTTP/1.1\r\n", request.method).into_bytes();
        for (name, value) in &headers {
            head.extend_from_slice(name.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");
        Ok(head)
    }
}

impl Transport for BuiltinTransport {
    fn backend(&self) -> Backend {
        Backend::Builtin
    }

    fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<Response, HttpError>> {
        Box::pin(self.exchange(request))
    }
}

fn expects_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn find_head_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Reads the head in chunks, failing once it outgrows
/// [`MAX_RESPONSE_HEAD_BYTES`], then reads the body until close.
async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, HttpError> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    while find_head_end(&raw).is_none() {
        if raw.len() > MAX_RESPONSE_HEAD_BYTES {
            return Err(malformed("response head too large"));
        }
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            return Err(malformed("missing end of headers"));
        }
        raw.extend_from_slice(&chunk[..read]);
    }
    reader.read_to_end(&mut raw).await?;
    Ok(raw)
}

/// Parses a complete HTTP/1.1 response read until connection close.
///
/// Header values are kept as raw bytes; only the status line must be ASCII.
fn parse_response(raw: &[u8], method: &Method) -> Result<Response, HttpError> {
    let head_end = find_head_end(raw).ok_or_else(|| malformed("missing end of headers"))?;
    if head_end > MAX_RESPONSE_HEAD_BYTES {
        return Err(malformed("response head too large"));
    }
    let rest = &raw[head_end + 4..];

    let mut lines = raw[..head_end]
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));
    let status_line = lines.next().unwrap_or_default();
    if !status_line.is_ascii() {
        return Err(malformed("status line is not ASCII"));
    }
    let status = parse_status_line(std::str::from_utf8(status_line).unwrap_or_default())?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| malformed("header line without colon"))?;
        headers.append(
            HeaderName::from_bytes(line[..colon].trim_ascii())?,
            HeaderValue::from_bytes(line[colon + 1..].trim_ascii())?,
        );
    }

    let no_body = *method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;
    let body = if no_body {
        Bytes::new()
    } else if is_chunked(&headers) {
        Bytes::from(decode_chunked(rest)?)
    } else if let Some(len) = content_length(&headers)? {
        let body = rest
            .get(..len)
            .ok_or_else(|| malformed("body shorter than Content-Length"))?;
        Bytes::copy_from_slice(body)
    } else {
        Bytes::copy_from_slice(rest)
    };

    Ok(Response::new(status, headers, body))
}

fn parse_status_line(line: &str) -> Result<StatusCode, HttpError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(malformed("unexpected protocol version"));
    }
    let code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed("missing status code"))?;
    StatusCode::from_u16(code).map_err(|_| malformed("invalid status code"))
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}

fn content_length(headers: &HeaderMap) -> Result<Option<usize>, HttpError> {
    headers
        .get(CONTENT_LENGTH)
        .map(|v| {
            v.to_str()
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .ok_or_else(|| malformed("invalid Content-Length"))
        })
        .transpose()
}

fn decode_chunked(mut input: &[u8]) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    loop {
        let line_end = input
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| malformed("unterminated chunk size"))?;
        let size_line = std::str::from_utf8(&input[..line_end])
            .map_err(|_| malformed("chunk size is not UTF-8"))?;
        // Chunk extensions follow a ';' and are ignored.
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| malformed("invalid chunk size"))?;
        input = &input[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        let chunk = input
            .get(..size)
            .ok_or_else(|| malformed("truncated chunk"))?;
        body.extend_from_slice(chunk);
        input = input
            .get(size + 2..)
            .ok_or_else(|| malformed("missing chunk terminator"))?;
    }
}

fn malformed(reason: &str) -> HttpError {
    HttpError::MalformedResponse(reason.to_owned())
}
