//! With no endpoint configured at all, the proxy must behave as a
//! transparent reverse proxy: BUFFERED responses with no post-hooks stream
//! straight through unmodified instead of being buffered in memory.

mod support;

use support::{spawn_fake_docker, start_proxy, Scripted};

#[tokio::test]
async fn passes_unconfigured_requests_straight_through() {
    let (docker_addr, _docker) = spawn_fake_docker(std::sync::Arc::new(|req| {
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "/version");
        Scripted::Json {
            status: 200,
            body: r#"{"Version":"1.0.0"}"#,
        }
    }));

    let (port, _proxy) = start_proxy("endpoints: {}\nadapters: {}\n", docker_addr);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{port}/version"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"Version":"1.0.0"}"#);
}
