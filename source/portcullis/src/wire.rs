//! JSON types exchanged with adapters over HTTP POST. These are the only
//! data adapters ever see; they never get a raw byte stream.

use serde::{Deserialize, Serialize};

pub const POWERSTRIP_PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Request")]
    pub request: String,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(rename = "ContentType")]
    pub content_type: Option<String>,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Code")]
    pub code: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreHookRequest {
    #[serde(rename = "PowerstripProtocolVersion")]
    pub version: u32,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    #[serde(rename = "ClientRequest")]
    pub client_request: ClientRequest,
}

impl PreHookRequest {
    pub fn new(client_request: ClientRequest) -> Self {
        PreHookRequest {
            version: POWERSTRIP_PROTOCOL_VERSION,
            kind: "pre-hook",
            client_request,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreHookResponse {
    #[serde(rename = "PowerstripProtocolVersion")]
    #[allow(dead_code)]
    pub version: u32,
    #[serde(rename = "ModifiedClientRequest")]
    pub modified_client_request: ClientRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostHookRequest {
    #[serde(rename = "PowerstripProtocolVersion")]
    pub version: u32,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    #[serde(rename = "ClientRequest")]
    pub client_request: ClientRequest,
    #[serde(rename = "ServerResponse")]
    pub server_response: ServerResponse,
}

impl PostHookRequest {
    pub fn new(client_request: ClientRequest, server_response: ServerResponse) -> Self {
        PostHookRequest {
            version: POWERSTRIP_PROTOCOL_VERSION,
            kind: "post-hook",
            client_request,
            server_response,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostHookResponse {
    #[serde(rename = "PowerstripProtocolVersion")]
    #[allow(dead_code)]
    pub version: u32,
    #[serde(rename = "ModifiedServerResponse")]
    pub modified_server_response: ServerResponse,
}
