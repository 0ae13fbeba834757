//! End-to-end gateway tests: real listener, real stub backends, real
//! HTTP client.

use gatehouse_config::GatewayConfig;
use gatehouse_server::GatewayServer;
use gatehouse_test::{expired_token, valid_token, StubBackend};
use http::StatusCode;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SECRET: &str = "integration-secret";

struct TestGateway {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    rules_path: PathBuf,
    _rules_dir: tempfile::TempDir,
}

impl TestGateway {
    async fn spawn(rules: serde_json::Value) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules_path = dir.path().join("rules.json");
        std::fs::write(&rules_path, rules.to_string()).expect("write rules");

        let vars: HashMap<String, String> = [
            ("GATEHOUSE_JWT_SECRET".to_string(), SECRET.to_string()),
            (
                "GATEHOUSE_RULES_FILE".to_string(),
                rules_path.display().to_string(),
            ),
        ]
        .into();
        let config = GatewayConfig::from_vars(&vars).expect("config");
        let server = GatewayServer::build(&config, None).expect("build gateway");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            shutdown: Some(tx),
            rules_path,
            _rules_dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn rules_for(backend_url: &str, admission: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "routes": [
            {"path_prefix": "/provider", "strip_prefix_segments": 1,
             "target_service": "service-provider"},
            {"path_prefix": "/ghost", "strip_prefix_segments": 0,
             "target_service": "service-ghost"}
        ],
        "admission": admission,
        "auth_whitelist": ["/provider/auth/login"],
        "services": {
            "service-provider": [backend_url]
        }
    })
}

#[tokio::test]
async fn relays_an_authenticated_request_end_to_end() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let token = valid_token(SECRET, "alice");
    let response = reqwest::Client::new()
        .get(gateway.url("/provider/order/list?page=2"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "pong");

    let received = backend.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "GET");
    assert_eq!(received[0].path_and_query, "/order/list?page=2");
    assert_eq!(received[0].header("x-user-name"), Some("alice"));
}

#[tokio::test]
async fn missing_token_is_rejected_without_backend_contact() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::get(gateway.url("/provider/order/list"))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 401);
    assert!(body["data"].is_null());
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/provider/order/list"))
        .bearer_auth(expired_token(SECRET, "alice"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn whitelisted_path_needs_no_token_and_carries_no_identity() {
    let backend = StubBackend::start(StatusCode::OK, "ok").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .post(gateway.url("/provider/auth/login"))
        .header("x-user-name", "mallory")
        .body(r#"{"user":"alice"}"#)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let received = backend.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path_and_query, "/auth/login");
    // The client-supplied identity header must not survive the gate.
    assert_eq!(received[0].header("x-user-name"), None);
    assert_eq!(&received[0].body[..], br#"{"user":"alice"}"#);
}

#[tokio::test]
async fn preflight_short_circuits_before_auth_and_routing() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, gateway.url("/provider/order/list"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn exhausted_window_yields_429_and_spares_the_backend() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let admission = serde_json::json!([
        {"resource": "provider_api",
         "scope": {"type": "api_group", "prefixes": ["/provider"]},
         "window_secs": 60, "max_requests": 2}
    ]);
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), admission)).await;

    let client = reqwest::Client::new();
    let token = valid_token(SECRET, "alice");

    for _ in 0..2 {
        let response = client
            .get(gateway.url("/provider/order/list"))
            .bearer_auth(&token)
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = client
        .get(gateway.url("/provider/order/list"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 429);

    assert_eq!(backend.request_count(), 2);
}

#[tokio::test]
async fn unknown_route_is_404_without_backend_contact() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/nowhere/at/all"))
        .bearer_auth(valid_token(SECRET, "alice"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn route_without_instances_is_503() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/ghost/thing"))
        .bearer_auth(valid_token(SECRET, "alice"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn backend_errors_are_relayed_untouched() {
    let backend = StubBackend::start(StatusCode::IM_A_TEAPOT, "short and stout").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/provider/order/list"))
        .bearer_auth(valid_token(SECRET, "alice"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn management_endpoints_answer_outside_the_pipeline() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    // No token required for management paths.
    let health = reqwest::get(gateway.url("/gateway/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "UP");

    let info = reqwest::get(gateway.url("/gateway/info")).await.unwrap();
    let body: serde_json::Value = info.json().await.unwrap();
    assert_eq!(body["name"], "gatehouse");
    let stages: Vec<String> = body["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        stages,
        vec!["cors", "request_log", "auth", "admission", "statistics", "response_log"]
    );

    // Drive one request through, then check it shows up in statistics.
    reqwest::Client::new()
        .get(gateway.url("/provider/order/list"))
        .bearer_auth(valid_token(SECRET, "alice"))
        .send()
        .await
        .unwrap();

    let stats = reqwest::get(gateway.url("/gateway/statistics")).await.unwrap();
    let body: serde_json::Value = stats.json().await.unwrap();
    assert_eq!(body["groups"]["/provider/order/list"]["success"], 1);

    // Snapshot reads are idempotent: a second query sees the same entry.
    let again = reqwest::get(gateway.url("/gateway/statistics")).await.unwrap();
    let body: serde_json::Value = again.json().await.unwrap();
    assert_eq!(body["groups"]["/provider/order/list"]["success"], 1);
}

#[tokio::test]
async fn rules_hot_reload_swaps_routes_atomically() {
    let backend = StubBackend::start(StatusCode::OK, "pong").await;
    let gateway = TestGateway::spawn(rules_for(&backend.base_url(), serde_json::json!([]))).await;

    let client = reqwest::Client::new();
    let token = valid_token(SECRET, "alice");

    // /beta is not routed yet.
    let response = client
        .get(gateway.url("/beta/thing"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Rewrite the rules file, adding the /beta route.
    let updated = serde_json::json!({
        "routes": [
            {"path_prefix": "/beta", "strip_prefix_segments": 1,
             "target_service": "service-provider"}
        ],
        "services": {"service-provider": [backend.base_url()]}
    });
    std::fs::write(&gateway.rules_path, updated.to_string()).unwrap();

    // The watcher debounces; poll until the new route takes effect.
    let mut reloaded = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let response = client
            .get(gateway.url("/beta/thing"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            reloaded = true;
            break;
        }
    }
    assert!(reloaded, "reloaded route never became active");
}
