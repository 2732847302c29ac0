//! Multiple `pre` adapters on the same endpoint run in configured order,
//! each seeing the previous adapter's output rather than the original
//! request.

mod support;

use std::sync::Arc;

use serde_json::json;
use support::{spawn_fake_docker, start_proxy, Scripted};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn chained_pre_hooks_compose_in_order() {
    let adapter = MockServer::start().await;

    // `first` only matches a body that does *not* yet carry `"Second":true`,
    // proving the daemon-bound request passed through `first` before `second`.
    Mock::given(method("POST"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "PowerstripProtocolVersion": 1,
            "ModifiedClientRequest": {
                "Method": "POST",
                "Request": "/containers/create",
                "Body": "{\"Image\":\"busybox\",\"First\":true}"
            }
        })))
        .mount(&adapter)
        .await;

    Mock::given(method("POST"))
        .and(path("/second"))
        .and(body_string_contains("\"First\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "PowerstripProtocolVersion": 1,
            "ModifiedClientRequest": {
                "Method": "POST",
                "Request": "/containers/create",
                "Body": "{\"Image\":\"busybox\",\"First\":true,\"Second\":true}"
            }
        })))
        .mount(&adapter)
        .await;

    let (docker_addr, _docker) = spawn_fake_docker(Arc::new(|req| {
        let body = String::from_utf8_lossy(&req.body);
        if body.contains("\"First\":true") && body.contains("\"Second\":true") {
            Scripted::Json {
                status: 201,
                body: r#"{"SeenByFakeDocker":42}"#,
            }
        } else {
            Scripted::Json {
                status: 400,
                body: r#"{"error":"chain did not compose"}"#,
            }
        }
    }));

    let config = format!(
        "endpoints:\n  \"POST /containers/create\":\n    pre: [a, b]\nadapters:\n  a: \"{}/first\"\n  b: \"{}/second\"\n",
        adapter.uri(),
        adapter.uri()
    );
    let (port, _proxy) = start_proxy(&config, docker_addr);

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{port}/containers/create"))
        .header("Content-Type", "application/json")
        .body(r#"{"Image":"busybox"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(response.text().await.unwrap(), r#"{"SeenByFakeDocker":42}"#);
}
