//! A single stateless JSON request/response exchange against an adapter
//! URL. No connection pooling guarantees are made or relied upon; each
//! invocation builds its own request.

use crate::error::{ProxyError, Result};
use crate::wire::{
    ClientRequest, PostHookRequest, PostHookResponse, PreHookRequest, PreHookResponse,
    ServerResponse,
};

#[derive(Clone)]
pub struct AdapterClient {
    http: reqwest::Client,
}

impl AdapterClient {
    pub fn new() -> Self {
        AdapterClient {
            http: reqwest::Client::new(),
        }
    }

    /// Run one pre-hook adapter. Returns the `ModifiedClientRequest` that
    /// replaces the current request for subsequent hooks and upstream.
    pub async fn pre_hook(
        &self,
        adapter: &str,
        url: &str,
        client_request: ClientRequest,
    ) -> Result<ClientRequest> {
        let payload = PreHookRequest::new(client_request);
        let parsed: PreHookResponse = self.invoke(adapter, url, &payload).await?;
        Ok(parsed.modified_client_request)
    }

    /// Run one post-hook adapter. Returns the `ModifiedServerResponse` that
    /// replaces the current response for subsequent hooks and the client.
    pub async fn post_hook(
        &self,
        adapter: &str,
        url: &str,
        client_request: ClientRequest,
        server_response: ServerResponse,
    ) -> Result<ServerResponse> {
        let payload = PostHookRequest::new(client_request, server_response);
        let parsed: PostHookResponse = self.invoke(adapter, url, &payload).await?;
        Ok(parsed.modified_server_response)
    }

    async fn invoke<P, R>(&self, adapter: &str, url: &str, payload: &P) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let fail = |reason: String| ProxyError::AdapterError {
            adapter: adapter.to_string(),
            url: url.to_string(),
            reason,
        };

        tracing::debug!(adapter, url, "invoking adapter");

        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| fail(format!("transport error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("adapter returned {status}: {body}")));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| fail(format!("malformed JSON response: {e}")))
    }
}

impl Default for AdapterClient {
    fn default() -> Self {
        Self::new()
    }
}
