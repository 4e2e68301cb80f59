#![allow(dead_code)]

use std::time::Duration;

use ipintel_client::client::ApiClient;
use ipintel_client::config::ClientConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY: &str = "test-key";

/// Client pointed at the mock server with the test key.
pub fn client_for(server: &MockServer) -> ApiClient {
    let cfg = ClientConfig {
        api_base_url: server.uri(),
        api_key: TEST_KEY.to_string(),
        ..Default::default()
    };
    ApiClient::new(&cfg).expect("client builds")
}

/// `GET /query/{ip}` answering 200 with `body` after `delay_ms`.
pub async fn mount_query(server: &MockServer, ip: &str, body: serde_json::Value, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/query/{ip}")))
        .and(header("X-API-Key", TEST_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}

/// `GET /query/{ip}` answering `status` with an `{error}` body.
pub async fn mount_query_error(server: &MockServer, ip: &str, status: u16, error: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/query/{ip}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({ "error": error })))
        .mount(server)
        .await;
}

/// `POST {route}` answering `status` with `body`.
pub async fn mount_post(server: &MockServer, route: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(header("X-API-Key", TEST_KEY))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
