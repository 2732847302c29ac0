//! Accept loop: binds the proxy's own listening socket(s) and spawns one
//! `engine::handle_connection` task per accepted client, same one-task-per-
//! connection shape as `motya`'s service runner, minus pingora's service
//! abstraction (the raw-stream hijack needs the raw socket, so the engine
//! owns the connection directly instead of going through a `ProxyHttp`
//! service).

use std::path::Path;

use tokio::net::{TcpListener, UnixListener};

use crate::app_context::AppContext;
use crate::engine;
use crate::error::Result;

/// Accept connections on a TCP address until the process is killed.
pub async fn serve_tcp(addr: &str, ctx: AppContext) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr, "listening for Docker API clients over TCP");

    loop {
        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true).ok();
        tracing::debug!(%peer, "accepted connection");
        let ctx = ctx.clone();
        tokio::spawn(async move {
            engine::handle_connection(stream, ctx).await;
        });
    }
}

/// Accept connections on a Unix domain socket until the process is killed.
/// Removes a stale socket file left behind by a previous run first.
pub async fn serve_unix(path: &Path, ctx: AppContext) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path)?;
    tracing::info!(path = %path.display(), "listening for Docker API clients over a unix socket");

    loop {
        let (stream, _) = listener.accept().await?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            engine::handle_connection(stream, ctx).await;
        });
    }
}
