//! Minimal HTTP/1.1 primitives the proxy engine needs at a lower level than
//! any higher-level HTTP framework exposes: reading a request/response head
//! off a raw socket, and framing a body by Content-Length or chunked
//! transfer-encoding. `httparse` does the line/header tokenizing, the same
//! way Docker API clients in the wider ecosystem parse responses read
//! directly off a Unix socket.

pub mod body;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProxyError, Result};

const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_HEADERS: usize = 64;

#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    /// Full request-target including the query string, verbatim.
    pub target: String,
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<Header>,
}

/// A socket reader that keeps whatever bytes were read past the head
/// boundary, so the subsequent body read doesn't lose them.
pub struct HeadReader {
    pub leftover: Vec<u8>,
}

impl HeadReader {
    pub fn new() -> Self {
        HeadReader { leftover: Vec::new() }
    }

    async fn fill<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        buf: &mut Vec<u8>,
    ) -> Result<usize> {
        let mut chunk = [0u8; 8192];
        let n = reader.read(&mut chunk).await?;
        if n > 0 {
            buf.extend_from_slice(&chunk[..n]);
        }
        Ok(n)
    }

    pub async fn read_request_head<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<RequestHead>> {
        let mut buf = std::mem::take(&mut self.leftover);
        loop {
            let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut req = httparse::Request::new(&mut raw_headers);
            match req.parse(&buf) {
                Ok(httparse::Status::Complete(consumed)) => {
                    let head = RequestHead {
                        method: req.method.unwrap_or("GET").to_string(),
                        target: req.path.unwrap_or("/").to_string(),
                        headers: req
                            .headers
                            .iter()
                            .map(|h| Header::new(h.name, String::from_utf8_lossy(h.value)))
                            .collect(),
                    };
                    self.leftover = buf.split_off(consumed);
                    return Ok(Some(head));
                }
                Ok(httparse::Status::Partial) => {
                    if buf.len() >= MAX_HEAD_SIZE {
                        return Err(ProxyError::InvalidRequest);
                    }
                    if self.fill(reader, &mut buf).await? == 0 {
                        if buf.is_empty() {
                            // Clean EOF before any bytes arrived: the client
                            // simply closed the connection.
                            return Ok(None);
                        }
                        return Err(ProxyError::ClientGone);
                    }
                }
                Err(_) => return Err(ProxyError::InvalidRequest),
            }
        }
    }

    pub async fn read_response_head<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<ResponseHead> {
        let mut buf = std::mem::take(&mut self.leftover);
        loop {
            let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut resp = httparse::Response::new(&mut raw_headers);
            match resp.parse(&buf) {
                Ok(httparse::Status::Complete(consumed)) => {
                    let head = ResponseHead {
                        status: resp.code.unwrap_or(502),
                        reason: resp.reason.unwrap_or("").to_string(),
                        headers: resp
                            .headers
                            .iter()
                            .map(|h| Header::new(h.name, String::from_utf8_lossy(h.value)))
                            .collect(),
                    };
                    self.leftover = buf.split_off(consumed);
                    return Ok(head);
                }
                Ok(httparse::Status::Partial) => {
                    if buf.len() >= MAX_HEAD_SIZE {
                        return Err(ProxyError::UpstreamError(
                            "upstream response head too large".to_string(),
                        ));
                    }
                    if self.fill(reader, &mut buf).await? == 0 {
                        return Err(ProxyError::UpstreamError(
                            "upstream closed before sending a full response head".to_string(),
                        ));
                    }
                }
                Err(e) => {
                    return Err(ProxyError::UpstreamError(format!(
                        "malformed upstream response head: {e}"
                    )))
                }
            }
        }
    }
}

impl Default for HeadReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a request line + headers for the outbound (upstream) request.
pub fn render_request_head(method: &str, target: &str, headers: &[Header]) -> Vec<u8> {
    let mut out = format!("{method} {target} HTTP/1.1\r\n").into_bytes();
    for h in headers {
        out.extend_from_slice(h.name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(h.value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

/// Render a status line + headers for the client-facing response.
pub fn render_response_head(status: u16, reason: &str, headers: &[Header]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status} {reason}\r\n").into_bytes();
    for h in headers {
        out.extend_from_slice(h.name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(h.value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        499 => "Client Closed Request",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "",
    }
}
