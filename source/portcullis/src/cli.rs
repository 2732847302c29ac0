//! Configuration sourced from the CLI and the `DOCKER_HOST` environment
//! variable, same fallback chain as most Docker API clients use.

use std::path::PathBuf;

use clap::Parser;

use crate::dialer::UpstreamTarget;
use crate::error::{ProxyError, Result};

const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

#[derive(Parser, Debug)]
#[command(name = "portcullis", about = "A policy-enforcing reverse proxy in front of the Docker API")]
pub struct Cli {
    /// Path to the adapter configuration file (YAML).
    #[arg(long, default_value = "portcullis.yaml")]
    pub config: PathBuf,

    /// Address this proxy listens on for incoming Docker API clients.
    #[arg(long, default_value = "127.0.0.1:2375")]
    pub listen: String,

    /// Listen on a Unix socket instead of (or in addition to) `--listen`.
    #[arg(long)]
    pub listen_socket: Option<PathBuf>,

    /// Where the real Docker daemon lives: `unix:///path/to.sock`,
    /// `tcp://host:port`, or a bare `host:port`. Falls back to
    /// `DOCKER_HOST`, then to the daemon's own default socket.
    #[arg(long, env = "DOCKER_HOST")]
    pub docker_host: Option<String>,
}

/// Resolve `--docker-host`/`DOCKER_HOST` into a concrete upstream target.
pub fn resolve_upstream(docker_host: Option<&str>) -> Result<UpstreamTarget> {
    let host = docker_host.unwrap_or(DEFAULT_DOCKER_HOST);

    if let Some(path) = host.strip_prefix("unix://") {
        return Ok(UpstreamTarget::Unix { path: PathBuf::from(path) });
    }

    let authority = host
        .strip_prefix("tcp://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);

    let (host_part, port_part) = authority.rsplit_once(':').ok_or_else(|| {
        ProxyError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{authority}' is not a valid host:port"),
        ))
    })?;

    let port: u16 = port_part.parse().map_err(|_| {
        ProxyError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{port_part}' is not a valid port"),
        ))
    })?;

    Ok(UpstreamTarget::Tcp { host: host_part.to_string(), port })
}

pub const BANNER: &str = r#"
  ____            _             _ _ _
 |  _ \ ___  _ __| |_ ___ _   _| | (_)___
 | |_) / _ \| '__| __/ __| | | | | | / __|
 |  __/ (_) | |  | || (__| |_| | | | \__ \
 |_|   \___/|_|   \__\___|\__,_|_|_|_|___/

      every request passes under the gate
"#;
