/// Per-response latched state: `Unknown` until the first of RAW or CHUNKED
/// is observed, otherwise BUFFERED at end-of-headers. Terminal once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unknown,
    Buffered,
    Chunked,
    Raw,
}

pub const RAW_STREAM_CONTENT_TYPE: &str = "application/vnd.docker.raw-stream";
