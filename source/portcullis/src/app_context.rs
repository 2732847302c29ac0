//! The long-lived, shared state every request handler reads from: the
//! immutable configuration snapshot, the adapter HTTP client, and the
//! resolved upstream target. Mirrors `motya::app_context::AppContext`, but
//! without the hot-reload watcher — one `Configuration` is installed at
//! startup and treated as immutable for the process lifetime.

use std::sync::Arc;

use portcullis_config::Configuration;

use crate::adapter_client::AdapterClient;
use crate::dialer::UpstreamTarget;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Configuration>,
    pub adapter_client: AdapterClient,
    pub upstream: Arc<UpstreamTarget>,
}

impl AppContext {
    pub fn new(config: Configuration, upstream: UpstreamTarget) -> Self {
        AppContext {
            config: Arc::new(config),
            adapter_client: AdapterClient::new(),
            upstream: Arc::new(upstream),
        }
    }
}
