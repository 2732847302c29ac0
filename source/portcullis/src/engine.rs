//! The proxy engine: the orchestrator sitting between the client socket
//! and the daemon socket. One call to [`process_one_request`] runs capture,
//! match, pre-hooks, upstream dispatch, mode selection, post-hooks, and
//! reply for a single HTTP request; [`handle_connection`] loops it over a
//! client connection, honoring keep-alive until RAW mode hands the socket
//! to the hijack bridge or the client disconnects.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::app_context::AppContext;
use crate::dialer::{self, UpstreamStream};
use crate::error::{ProxyError, Result};
use crate::hijack;
use crate::http1::{
    body, find_header, render_request_head, render_response_head, reason_phrase, Header,
    HeadReader, RequestHead,
};
use crate::matcher;
use crate::mode::{Mode, RAW_STREAM_CONTENT_TYPE};
use crate::wire::ClientRequest;

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_TAR: &str = "application/tar";

/// What the connection loop should do after one request/response cycle.
pub enum Outcome {
    /// Clean EOF: the client closed before sending another request.
    Eof,
    /// Finish the response and read another request on the same socket.
    KeepAlive,
    /// Finish the response and close the connection (client asked to, or we
    /// can no longer trust its framing).
    Close,
    /// RAW mode was latched: headers have already been written, the caller
    /// must hand the (still-open) client socket and this upstream
    /// connection to the Hijack Bridge.
    Hijack(UpstreamStream),
}

/// Drive one client connection end to end.
pub async fn handle_connection<S>(mut stream: S, ctx: AppContext)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut head_reader = HeadReader::new();

    loop {
        match process_one_request(&mut stream, &ctx, &mut head_reader).await {
            Ok(Outcome::Eof) => return,
            Ok(Outcome::KeepAlive) => continue,
            Ok(Outcome::Close) => return,
            Ok(Outcome::Hijack(upstream)) => {
                hijack::bridge(stream, upstream).await;
                return;
            }
            Err(ProxyError::ClientGone) => {
                tracing::debug!("client disconnected mid-request");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                let (status, body) = e.status_and_body();
                let _ = write_error_response(&mut stream, status, &body).await;
                return;
            }
        }
    }
}

async fn write_error_response<S: AsyncWrite + Unpin>(
    stream: &mut S,
    status: u16,
    body: &str,
) -> Result<()> {
    let headers = vec![
        Header::new("Content-Type", "text/plain; charset=utf-8"),
        Header::new("Content-Length", body.len().to_string()),
        Header::new("Connection", "close"),
    ];
    let head = render_response_head(status, reason_phrase(status), &headers);
    stream.write_all(&head).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

async fn process_one_request<S>(
    stream: &mut S,
    ctx: &AppContext,
    head_reader: &mut HeadReader,
) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // --- Step 1: capture ---
    let request_head = match head_reader.read_request_head(stream).await? {
        Some(head) => head,
        None => return Ok(Outcome::Eof),
    };

    let client_wants_close = connection_requests_close(&request_head);

    let (raw_body, is_tar) = read_request_body(stream, head_reader, &request_head).await?;
    let content_type = find_header(&request_head.headers, "content-type").map(str::to_string);
    let is_json = content_type
        .as_deref()
        .map(|ct| content_type_base(ct) == APPLICATION_JSON)
        .unwrap_or(false);

    let original_method = request_head.method.clone();
    let original_target = request_head.target.clone();
    let original_body: Option<String> = if is_json {
        Some(String::from_utf8_lossy(&raw_body).into_owned())
    } else {
        None
    };

    let mut method = original_method.clone();
    let mut target = original_target.clone();
    let mut body: Vec<u8> = raw_body;

    // --- Step 2: match ---
    let path = split_path(&target);
    let matched = matcher::match_endpoints(&ctx.config, &method, path)?;
    let mut pre_hooks = Vec::new();
    let mut post_hooks = Vec::new();
    for pattern in matched {
        if let Some(cfg) = ctx.config.endpoint_config(pattern) {
            pre_hooks.extend(cfg.pre.iter().cloned());
            post_hooks.extend(cfg.post.iter().cloned());
        }
    }

    // --- Step 3: pre-hook chain (skipped entirely for tar bodies) ---
    if !is_tar {
        let mut current_body_for_hooks = if is_json {
            Some(String::from_utf8_lossy(&body).into_owned())
        } else {
            None
        };

        for adapter in &pre_hooks {
            let url = ctx.config.adapter_uri(adapter).ok_or_else(|| {
                ProxyError::AdapterError {
                    adapter: adapter.clone(),
                    url: String::new(),
                    reason: "adapter not found in configuration".to_string(),
                }
            })?;

            let client_request = ClientRequest {
                method: method.clone(),
                request: target.clone(),
                body: current_body_for_hooks.clone(),
            };

            let modified = ctx
                .adapter_client
                .pre_hook(adapter, url, client_request)
                .await?;

            method = modified.method;
            target = modified.request;
            if is_json {
                current_body_for_hooks = modified.body;
                body = current_body_for_hooks
                    .clone()
                    .map(String::into_bytes)
                    .unwrap_or_default();
            } else if let Some(rewritten) = modified.body {
                // Non-JSON bodies round-trip as `None` through adapters that
                // don't touch them; only overwrite `body` when an adapter
                // actually sent one back, so a no-op adapter can't collapse
                // it to empty.
                body = rewritten.into_bytes();
            }
        }
    }

    // --- Step 4: upstream dispatch ---
    let mut outbound_headers: Vec<Header> = request_head
        .headers
        .iter()
        .filter(|h| {
            !h.name.eq_ignore_ascii_case("content-length")
                && !h.name.eq_ignore_ascii_case("transfer-encoding")
                && !h.name.eq_ignore_ascii_case("host")
                && !h.name.eq_ignore_ascii_case("connection")
        })
        .cloned()
        .collect();
    outbound_headers.push(Header::new("Host", ctx.upstream.host_header()));
    outbound_headers.push(Header::new("Content-Length", body.len().to_string()));
    // The dialer never pools connections; tell the daemon not to either, so
    // a BUFFERED response with no framing is reliably EOF-terminated.
    outbound_headers.push(Header::new("Connection", "close"));

    let mut upstream = dialer::dial(&ctx.upstream).await?;
    let request_bytes = render_request_head(&method, &target, &outbound_headers);
    upstream.write_all(&request_bytes).await?;
    upstream.write_all(&body).await?;
    upstream.flush().await?;

    // --- Step 5: mode selection ---
    let mut upstream_head_reader = HeadReader::new();
    let response_head = upstream_head_reader.read_response_head(&mut upstream).await?;
    let response_content_type =
        find_header(&response_head.headers, "content-type").map(str::to_string);
    let transfer_encoding_chunked = find_header(&response_head.headers, "transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    let mode = if response_content_type.as_deref() == Some(RAW_STREAM_CONTENT_TYPE) {
        Mode::Raw
    } else if transfer_encoding_chunked {
        Mode::Chunked
    } else {
        Mode::Buffered
    };

    match mode {
        Mode::Raw => {
            let headers = vec![Header::new("Content-Type", RAW_STREAM_CONTENT_TYPE)];
            let head = render_response_head(200, "OK", &headers);
            stream.write_all(&head).await?;
            stream.flush().await?;
            Ok(Outcome::Hijack(upstream))
        }
        Mode::Chunked => {
            let mut headers = response_head.headers.clone();
            strip_header(&mut headers, "connection");
            headers.push(Header::new(
                "Connection",
                if client_wants_close { "close" } else { "keep-alive" },
            ));
            let head = render_response_head(response_head.status, &response_head.reason, &headers);
            stream.write_all(&head).await?;
            stream.flush().await?;
            body::forward_chunked_raw(
                &mut upstream,
                stream,
                &mut upstream_head_reader.leftover,
            )
            .await?;
            Ok(close_or_keep_alive(client_wants_close))
        }
        Mode::Buffered => {
            handle_buffered_response(
                stream,
                &mut upstream,
                &mut upstream_head_reader.leftover,
                response_head.status,
                &response_head.reason,
                response_head.headers.clone(),
                ctx,
                &original_method,
                &original_target,
                original_body,
                &post_hooks,
                client_wants_close,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_buffered_response<S>(
    client: &mut S,
    upstream: &mut UpstreamStream,
    leftover: &mut Vec<u8>,
    status: u16,
    reason: &str,
    response_headers: Vec<Header>,
    ctx: &AppContext,
    original_method: &str,
    original_target: &str,
    original_body: Option<String>,
    post_hooks: &[String],
    client_wants_close: bool,
) -> Result<Outcome>
where
    S: AsyncWrite + Unpin,
{
    let content_length = find_header(&response_headers, "content-length")
        .and_then(|v| v.trim().parse::<usize>().ok());

    if post_hooks.is_empty() {
        // Step 5 optimization: nothing downstream needs the buffered bytes,
        // so stream them straight through instead of accumulating them.
        let mut headers = response_headers;
        strip_header(&mut headers, "connection");
        headers.push(Header::new(
            "Connection",
            if client_wants_close { "close" } else { "keep-alive" },
        ));
        let head = render_response_head(status, reason, &headers);
        client.write_all(&head).await?;
        client.flush().await?;

        match content_length {
            Some(len) => stream_fixed(upstream, client, leftover, len).await?,
            None => stream_to_eof(upstream, client, leftover).await?,
        }
        return Ok(close_or_keep_alive(client_wants_close));
    }

    let raw_body = match content_length {
        Some(len) => body::read_fixed(upstream, leftover, len).await?,
        None => body::read_until_eof(upstream, leftover).await?,
    };

    let response_content_type =
        find_header(&response_headers, "content-type").map(str::to_string);

    let mut current = crate::wire::ServerResponse {
        content_type: response_content_type,
        body: String::from_utf8_lossy(&raw_body).into_owned(),
        code: status,
    };

    // --- Step 6: post-hook chain, carrying the *original* client request ---
    for adapter in post_hooks {
        let url = ctx
            .config
            .adapter_uri(adapter)
            .ok_or_else(|| ProxyError::AdapterError {
                adapter: adapter.clone(),
                url: String::new(),
                reason: "adapter not found in configuration".to_string(),
            })?;

        let client_request = ClientRequest {
            method: original_method.to_string(),
            request: original_target.to_string(),
            body: original_body.clone(),
        };

        current = ctx
            .adapter_client
            .post_hook(adapter, url, client_request, current)
            .await?;
    }

    // --- Step 7: reply ---
    let final_body = current.body.into_bytes();
    let mut headers = vec![Header::new("Content-Length", final_body.len().to_string())];
    if let Some(ct) = current.content_type {
        headers.push(Header::new("Content-Type", ct));
    }
    headers.push(Header::new(
        "Connection",
        if client_wants_close { "close" } else { "keep-alive" },
    ));

    let head = render_response_head(current.code, reason_phrase(current.code), &headers);
    client.write_all(&head).await?;
    client.write_all(&final_body).await?;
    client.flush().await?;

    Ok(close_or_keep_alive(client_wants_close))
}

fn close_or_keep_alive(client_wants_close: bool) -> Outcome {
    if client_wants_close {
        Outcome::Close
    } else {
        Outcome::KeepAlive
    }
}

async fn stream_fixed<R, W>(
    reader: &mut R,
    writer: &mut W,
    leftover: &mut Vec<u8>,
    length: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let body = body::read_fixed(reader, leftover, length).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

async fn stream_to_eof<R, W>(reader: &mut R, writer: &mut W, leftover: &mut Vec<u8>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let body = body::read_until_eof(reader, leftover).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the request body: chunked client bodies are fully decoded (so they
/// can be re-sent with a plain Content-Length); `application/tar` bodies are
/// read but flagged so the pre-hook chain skips them.
async fn read_request_body<S: AsyncRead + Unpin>(
    stream: &mut S,
    head_reader: &mut HeadReader,
    head: &RequestHead,
) -> Result<(Vec<u8>, bool)> {
    let content_type = find_header(&head.headers, "content-type").unwrap_or_default();
    let is_tar = content_type_base(content_type) == APPLICATION_TAR;

    let chunked = find_header(&head.headers, "transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    let body = if chunked {
        body::read_chunked_decoded(stream, &mut head_reader.leftover).await?
    } else if let Some(len) = find_header(&head.headers, "content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        body::read_fixed(stream, &mut head_reader.leftover, len).await?
    } else {
        Vec::new()
    };

    Ok((body, is_tar))
}

fn content_type_base(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

fn split_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

fn connection_requests_close(head: &RequestHead) -> bool {
    find_header(&head.headers, "connection")
        .map(|v| v.eq_ignore_ascii_case("close"))
        .unwrap_or(false)
}

fn strip_header(headers: &mut Vec<Header>, name: &str) {
    headers.retain(|h| !h.name.eq_ignore_ascii_case(name));
}
