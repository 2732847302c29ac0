use thiserror::Error;

/// The proxy's runtime error taxonomy. `ConfigInvalid`/`NoConfiguration`
/// abort startup and live in `portcullis_config::ConfigError`; everything
/// here is a per-request runtime error.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A query string was passed to the matcher. Always an internal
    /// invariant violation — callers must strip it first.
    #[error("invalid request: path must not contain a query string")]
    InvalidRequest,

    /// An adapter returned a non-2xx response, sent malformed JSON, or the
    /// transport to it failed outright.
    #[error("adapter '{adapter}' at {url} failed: {reason}")]
    AdapterError {
        adapter: String,
        url: String,
        reason: String,
    },

    /// The upstream Docker daemon connection could not be established, or
    /// dropped before the response was complete.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// The client connection closed before the engine finished writing the
    /// response. Not surfaced to anyone; the request is just abandoned.
    #[error("client disconnected before the response was written")]
    ClientGone,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Map this error onto the short 5xx response the client socket sees:
    /// user-visible failures are rendered as an appropriate 5xx with a
    /// short text body.
    pub fn status_and_body(&self) -> (u16, String) {
        match self {
            ProxyError::InvalidRequest => (400, "bad request\n".to_string()),
            ProxyError::AdapterError { .. } => (502, format!("{self}\n")),
            ProxyError::UpstreamError(_) => (502, format!("{self}\n")),
            ProxyError::ClientGone => (499, String::new()),
            ProxyError::Io(e) => (502, format!("upstream I/O error: {e}\n")),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
