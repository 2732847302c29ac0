//! Opens a fresh byte-stream connection to the Docker daemon per request,
//! over TCP or a Unix domain socket. Connections are never pooled —
//! Docker's stream endpoints (attach, events) need a dedicated connection
//! per call.

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};

use crate::error::{ProxyError, Result};

/// Where the Docker daemon can be reached. Selection of this value is
/// external to the core — `portcullis::cli` resolves it from
/// flags/`DOCKER_HOST`.
#[derive(Debug, Clone)]
pub enum UpstreamTarget {
    Tcp { host: String, port: u16 },
    Unix { path: PathBuf },
}

impl UpstreamTarget {
    /// The authority to put in the outbound `Host` header, omitting the
    /// port when it is the HTTP default, same as Powerstrip's RFC 2616
    /// handling.
    pub fn host_header(&self) -> String {
        match self {
            UpstreamTarget::Tcp { host, port } if *port == 80 => host.clone(),
            UpstreamTarget::Tcp { host, port } => format!("{host}:{port}"),
            UpstreamTarget::Unix { .. } => "localhost".to_string(),
        }
    }
}

/// A connected byte stream to the upstream, abstracting over TCP vs. Unix
/// so the rest of the engine (HTTP/1.1 codec, hijack bridge) can treat it
/// uniformly as `AsyncRead + AsyncWrite`.
pub enum UpstreamStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for UpstreamStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            UpstreamStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for UpstreamStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            UpstreamStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            UpstreamStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            UpstreamStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            UpstreamStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            UpstreamStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

pub async fn dial(target: &UpstreamTarget) -> Result<UpstreamStream> {
    match target {
        UpstreamTarget::Tcp { host, port } => {
            tracing::debug!(host, port, "dialing upstream over TCP");
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(|e| {
                    ProxyError::UpstreamError(format!("connect to {host}:{port} failed: {e}"))
                })?;
            stream.set_nodelay(true).ok();
            Ok(UpstreamStream::Tcp(stream))
        }
        UpstreamTarget::Unix { path } => {
            tracing::debug!(path = %path.display(), "dialing upstream over unix socket");
            let stream = UnixStream::connect(path).await.map_err(|e| {
                ProxyError::UpstreamError(format!("connect to {} failed: {e}", path.display()))
            })?;
            Ok(UpstreamStream::Unix(stream))
        }
    }
}
