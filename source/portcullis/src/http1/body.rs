//! Body framing: Content-Length, chunked transfer-encoding, and
//! read-until-close, each either fully decoded into a buffer (for bodies
//! the engine or an adapter needs to inspect) or forwarded byte-for-byte
//! (for the streaming pass-through paths, which never rewrite chunked
//! framing).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProxyError, Result};

/// Read exactly `length` bytes, starting with whatever is already buffered
/// in `leftover` (drained first).
pub async fn read_fixed<R: AsyncRead + Unpin>(
    reader: &mut R,
    leftover: &mut Vec<u8>,
    length: usize,
) -> Result<Vec<u8>> {
    let mut body = std::mem::take(leftover);
    if body.len() > length {
        *leftover = body.split_off(length);
        return Ok(body);
    }
    body.reserve(length.saturating_sub(body.len()));
    while body.len() < length {
        let mut chunk = [0u8; 8192];
        let want = (length - body.len()).min(chunk.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(ProxyError::UpstreamError(
                "connection closed before the full body arrived".to_string(),
            ));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

/// Read until the peer closes its write side (no Content-Length, not
/// chunked — the response is terminated by end-of-connection).
pub async fn read_until_eof<R: AsyncRead + Unpin>(
    reader: &mut R,
    leftover: &mut Vec<u8>,
) -> Result<Vec<u8>> {
    let mut body = std::mem::take(leftover);
    loop {
        let mut chunk = [0u8; 8192];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&chunk[..n]);
    }
}

/// Decode a chunked-transfer-encoded body into its raw bytes (used for
/// *request* bodies, which are always fully buffered and re-sent with a
/// plain Content-Length, stripping `Transfer-Encoding: chunked`).
pub async fn read_chunked_decoded<R: AsyncRead + Unpin>(
    reader: &mut R,
    leftover: &mut Vec<u8>,
) -> Result<Vec<u8>> {
    let mut raw = std::mem::take(leftover);
    let mut decoded = Vec::new();
    let mut pos = 0usize;

    loop {
        match parse_chunk_size(&raw[pos..]) {
            Some((size, header_len)) => {
                let body_start = pos + header_len;
                let body_end = body_start + size;
                let trailer_end = body_end + 2; // trailing CRLF after chunk data
                if raw.len() < trailer_end {
                    fill_more(reader, &mut raw).await?;
                    continue;
                }
                if size == 0 {
                    // Last chunk: consume trailer headers up to the blank line.
                    match find_blank_line(&raw[body_start..]) {
                        Some(trailer_len) => {
                            *leftover = raw.split_off(body_start + trailer_len);
                            return Ok(decoded);
                        }
                        None => {
                            fill_more(reader, &mut raw).await?;
                            continue;
                        }
                    }
                }
                decoded.extend_from_slice(&raw[body_start..body_end]);
                pos = trailer_end;
            }
            None => {
                fill_more(reader, &mut raw).await?;
            }
        }
    }
}

/// Forward a chunked-transfer-encoded response body byte-for-byte, tracking
/// chunk boundaries only to know when the body ends (never re-encoding).
pub async fn forward_chunked_raw<R, W>(
    reader: &mut R,
    writer: &mut W,
    leftover: &mut Vec<u8>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut raw = std::mem::take(leftover);
    let mut flushed = 0usize;
    let mut pos = 0usize;

    loop {
        match parse_chunk_size(&raw[pos..]) {
            Some((size, header_len)) => {
                let body_start = pos + header_len;
                let body_end = body_start + size;
                let trailer_end = body_end + 2;
                if size == 0 {
                    match find_blank_line(&raw[body_start..]) {
                        Some(trailer_len) => {
                            let end = body_start + trailer_len;
                            writer.write_all(&raw[flushed..end]).await?;
                            writer.flush().await?;
                            *leftover = raw.split_off(end);
                            return Ok(());
                        }
                        None => {
                            fill_more(reader, &mut raw).await?;
                            continue;
                        }
                    }
                }
                if raw.len() < trailer_end {
                    fill_more(reader, &mut raw).await?;
                    continue;
                }
                pos = trailer_end;
            }
            None => {
                fill_more(reader, &mut raw).await?;
                continue;
            }
        }

        // Flush whatever whole chunks we've accumulated so far so large
        // streaming bodies (pull/build) don't wait for the whole body.
        if pos > flushed {
            writer.write_all(&raw[flushed..pos]).await?;
            writer.flush().await?;
            flushed = pos;
        }
    }
}

async fn fill_more<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<()> {
    let mut chunk = [0u8; 8192];
    let n = reader.read(&mut chunk).await?;
    if n == 0 {
        return Err(ProxyError::UpstreamError(
            "connection closed mid-chunked-body".to_string(),
        ));
    }
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}

/// Parse one `<hex-size>[;ext]\r\n` chunk header at the start of `buf`.
/// Returns the chunk size and the number of bytes the header itself took.
fn parse_chunk_size(buf: &[u8]) -> Option<(usize, usize)> {
    let line_end = buf.windows(2).position(|w| w == b"\r\n")?;
    let line = &buf[..line_end];
    let size_str = match line.iter().position(|&b| b == b';') {
        Some(semi) => &line[..semi],
        None => line,
    };
    let size_str = std::str::from_utf8(size_str).ok()?.trim();
    let size = usize::from_str_radix(size_str, 16).ok()?;
    Some((size, line_end + 2))
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| {
            // A last-chunk with no trailers is just the final CRLF.
            if buf.starts_with(b"\r\n") {
                Some(2)
            } else {
                None
            }
        })
}
