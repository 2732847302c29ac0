//! `application/tar` request bodies (build contexts) skip the pre-hook
//! chain entirely rather than attempting to parse binary data as JSON. The
//! adapter points at an address nothing is listening on; if the engine
//! invoked it, the request would fail with a transport error instead of
//! reaching the daemon.

mod support;

use support::{spawn_fake_docker, start_proxy, Scripted};

#[tokio::test]
async fn tar_request_bodies_skip_configured_pre_hooks() {
    let (docker_addr, _docker) = spawn_fake_docker(std::sync::Arc::new(|req| {
        assert_eq!(req.target, "/build");
        assert_eq!(req.body, b"not-really-a-tar-but-binary-enough");
        Scripted::Json {
            status: 200,
            body: r#"{"stream":"built"}"#,
        }
    }));

    let config =
        "endpoints:\n  \"POST /build\":\n    pre: [unreachable]\nadapters:\n  unreachable: \"http://127.0.0.1:1\"\n";
    let (port, _proxy) = start_proxy(config, docker_addr);

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{port}/build"))
        .header("Content-Type", "application/tar")
        .body(&b"not-really-a-tar-but-binary-enough"[..])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"stream":"built"}"#);
}
