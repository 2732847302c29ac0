use std::process;

use clap::Parser;
use miette::IntoDiagnostic;
use tokio::runtime::Runtime;

use portcullis::app_context::AppContext;
use portcullis::cli::{self, Cli, BANNER};
use portcullis::listener;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    println!("{BANNER}");

    let rt = Runtime::new().expect("failed to build the tokio runtime");
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> miette::Result<()> {
    let config = portcullis_config::load_from_path(&cli.config).into_diagnostic()?;
    let upstream = cli::resolve_upstream(cli.docker_host.as_deref()).into_diagnostic()?;

    tracing::info!(
        endpoints = config.endpoint_patterns().count(),
        "configuration loaded"
    );

    let ctx = AppContext::new(config, upstream);

    tracing::info!(pid = process::id(), "portcullis starting");

    match cli.listen_socket {
        Some(path) => listener::serve_unix(&path, ctx).await.into_diagnostic(),
        None => listener::serve_tcp(&cli.listen, ctx).await.into_diagnostic(),
    }
}
