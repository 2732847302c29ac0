//! Once RAW mode is latched, the client socket and the upstream socket are
//! pumped as two independent byte streams, with
//! half-close propagated in each direction (closing stdin on `attach`
//! without killing the still-streaming stdout, for example).
//!
//! This replaces `DockerProxyClient.rawDataReceived`/`handleResponseEnd`'s
//! manual `loseWriteConnection` dance from the original Twisted
//! implementation with two concurrent `tokio::io::copy` pumps.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Pump bytes in both directions between `client` and `upstream` until both
/// directions have closed. A read-side close on one socket shuts down the
/// write side of the other; an I/O error on either side tears down both.
pub async fn bridge<A, B>(client: A, upstream: B)
where
    A: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut client_r, mut client_w) = tokio::io::split(client);
    let (mut upstream_r, mut upstream_w) = tokio::io::split(upstream);

    let client_to_upstream = tokio::spawn(async move {
        let result = tokio::io::copy(&mut client_r, &mut upstream_w).await;
        let _ = upstream_w.shutdown().await;
        result
    });

    let upstream_to_client = tokio::spawn(async move {
        let result = tokio::io::copy(&mut upstream_r, &mut client_w).await;
        let _ = client_w.shutdown().await;
        result
    });

    let (a, b) = tokio::join!(client_to_upstream, upstream_to_client);

    if let Err(e) = a.unwrap_or_else(|je| Ok(log_join_error(je))) {
        tracing::debug!(error = %e, "hijack: client->upstream pump ended");
    }
    if let Err(e) = b.unwrap_or_else(|je| Ok(log_join_error(je))) {
        tracing::debug!(error = %e, "hijack: upstream->client pump ended");
    }
}

fn log_join_error(e: tokio::task::JoinError) -> u64 {
    tracing::warn!(error = %e, "hijack pump task panicked");
    0
}
