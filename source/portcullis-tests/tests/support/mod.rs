//! Shared fixtures for the integration tests: a scriptable fake Docker
//! daemon (standing in for `FakeDockerTowelResource` in the original
//! implementation's test suite) and a helper that boots the proxy engine
//! directly against an ephemeral port, the same way `motya-tests` boots a
//! pingora server in-process against a `MockServer`.

use std::net::SocketAddr;
use std::sync::Arc;

use portcullis::app_context::AppContext;
use portcullis::dialer::UpstreamTarget;
use portcullis::engine;
use portcullis::http1::{find_header, reason_phrase, HeadReader};
use portcullis_config::Configuration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub body: Vec<u8>,
}

/// What the fake daemon writes back for one accepted connection.
pub enum Scripted {
    Json { status: u16, body: &'static str },
    /// Perform the raw-stream handshake, then echo every byte read back
    /// until the client closes its side.
    RawEcho,
    /// Write this exact chunked-encoded body, untouched.
    Chunked(&'static [u8]),
}

pub type Behavior = Arc<dyn Fn(CapturedRequest) -> Scripted + Send + Sync + 'static>;

/// Start a fake Docker daemon on an ephemeral port, dispatching every
/// accepted connection's single request through `behavior`.
pub fn spawn_fake_docker(behavior: Behavior) -> (SocketAddr, JoinHandle<()>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let addr = std_listener.local_addr().unwrap();
    let listener = TcpListener::from_std(std_listener).unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            let behavior = behavior.clone();
            tokio::spawn(async move {
                handle_one_request(&mut stream, behavior).await;
            });
        }
    });

    (addr, handle)
}

async fn handle_one_request(stream: &mut TcpStream, behavior: Behavior) {
    let mut head_reader = HeadReader::new();
    let head = match head_reader.read_request_head(stream).await {
        Ok(Some(h)) => h,
        _ => return,
    };

    let content_length = find_header(&head.headers, "content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = std::mem::take(&mut head_reader.leftover);
    while body.len() < content_length {
        let mut buf = [0u8; 4096];
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }
    body.truncate(content_length);

    let captured = CapturedRequest {
        method: head.method.clone(),
        target: head.target.clone(),
        body,
    };

    match behavior(captured) {
        Scripted::Json { status, body } => {
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                reason_phrase(status),
                body.len()
            );
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(body.as_bytes()).await;
            let _ = stream.flush().await;
        }
        Scripted::RawEcho => {
            let head = b"HTTP/1.1 200 OK\r\nContent-Type: application/vnd.docker.raw-stream\r\n\r\n";
            let _ = stream.write_all(head).await;
            let _ = stream.flush().await;
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if stream.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                        let _ = stream.flush().await;
                    }
                }
            }
        }
        Scripted::Chunked(raw) => {
            let head =
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n";
            let _ = stream.write_all(head).await;
            let _ = stream.write_all(raw).await;
            let _ = stream.flush().await;
        }
    }
}

/// Boot the proxy engine against `config_yaml`, dialing `upstream` for
/// every request. Returns the port it's listening on.
pub fn start_proxy(config_yaml: &str, upstream: SocketAddr) -> (u16, JoinHandle<()>) {
    let config = Configuration::parse(config_yaml).expect("test configuration must be valid");
    let target = UpstreamTarget::Tcp {
        host: upstream.ip().to_string(),
        port: upstream.port(),
    };
    let ctx = AppContext::new(config, target);

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let port = std_listener.local_addr().unwrap().port();
    let listener = TcpListener::from_std(std_listener).unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            stream.set_nodelay(true).ok();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                engine::handle_connection(stream, ctx).await;
            });
        }
    });

    (port, handle)
}

/// Connect a raw TCP stream to the proxy, for scenarios reqwest can't
/// express: the raw hijack handshake and verbatim chunked framing.
pub async fn raw_connect(port: u16) -> TcpStream {
    TcpStream::connect(("127.0.0.1", port)).await.unwrap()
}
