use entsync_sync::classify::{ExceptionKind, exception_kind};
use entsync_sync::{HttpRemoteConfig, HttpRemoteStore, RemoteError, RemoteRequest, RemoteStore};
use entsync_types::{Key, Response};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> HttpRemoteStore {
    HttpRemoteStore::new(HttpRemoteConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

fn orders(key: Option<Key>) -> RemoteRequest {
    RemoteRequest {
        table_key: Some("orders".to_string()),
        key,
        ..Default::default()
    }
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = HttpRemoteConfig::default();
    assert_eq!(config.base_url, "http://localhost:8080");
    assert_eq!(config.timeout_secs, 60);
}

#[test]
fn config_serde_fills_defaults() {
    let config: HttpRemoteConfig =
        serde_json::from_value(json!({ "base_url": "https://api.example.com" })).unwrap();
    assert_eq!(config.base_url, "https://api.example.com");
    assert_eq!(config.timeout_secs, 60);
}

// ── CRUD ────────────────────────────────────────────────────────

#[tokio::test]
async fn get_sends_key_and_params_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/json/v2"))
        .and(query_param("key", "42"))
        .and(query_param("status", "open"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "key": "42" })))
        .expect(1)
        .mount(&server)
        .await;

    let request = orders(Some(Key::remote("42")))
        .with_param("status", json!("open"))
        .with_param("limit", json!(10));
    let response = store_for(&server).get(&request).await.unwrap();

    assert_eq!(response, Response::ok(json!({ "key": "42" })));
}

#[tokio::test]
async fn post_creates_without_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/json/v2"))
        .and(body_json(json!({ "parameters": {}, "data": { "name": "A" } })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "key": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let request = orders(None).with_data(serde_json::from_value(json!({ "name": "A" })).unwrap());
    let response = store_for(&server).post(&request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.data, json!({ "key": 42 }));
}

#[tokio::test]
async fn post_carries_button_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/json/v2"))
        .and(body_json(json!({
            "parameters": { "key": "42", "button": "custom.delete_with_undo" },
            "data": {}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = orders(Some(Key::remote("42"))).with_button("custom.delete_with_undo");
    let response = store_for(&server).post(&request).await.unwrap();

    assert_eq!(response.data, serde_json::Value::Null);
}

#[tokio::test]
async fn put_updates_by_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/json/v2"))
        .and(body_json(json!({
            "parameters": { "key": "7" },
            "data": { "qty": 2 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let request =
        orders(Some(Key::remote("7"))).with_data(serde_json::from_value(json!({ "qty": 2 })).unwrap());
    store_for(&server).put(&request).await.unwrap();
}

#[tokio::test]
async fn del_sends_key_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/json/v2"))
        .and(query_param("key", "42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = store_for(&server)
        .del(&orders(Some(Key::remote("42"))))
        .await
        .unwrap();

    assert_eq!(response.status, 204);
}

// ── Side channel ────────────────────────────────────────────────

#[tokio::test]
async fn request_post_sends_function_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/json/v2"))
        .and(header("Function", "undoDelete"))
        .and(body_json(json!({ "parameters": { "key": "42" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "restored": true })))
        .expect(1)
        .mount(&server)
        .await;

    let response = store_for(&server)
        .request_post(
            "/orders/json/v2",
            json!({ "parameters": { "key": "42" } }),
            &[("Function", "undoDelete")],
        )
        .await
        .unwrap();

    assert_eq!(response.data, json!({ "restored": true }));
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn error_status_keeps_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/json/v2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "exception": { "type": "NullReferenceException" }
        })))
        .mount(&server)
        .await;

    let error = store_for(&server)
        .del(&orders(Some(Key::remote("42"))))
        .await
        .unwrap_err();

    assert_eq!(error.response().map(|r| r.status), Some(500));
    assert_eq!(exception_kind(&error), ExceptionKind::AlreadyRemoved);
}

#[tokio::test]
async fn plain_text_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let error = store_for(&server)
        .get(&orders(Some(Key::remote("1"))))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        RemoteError::Status(Response::new(503, json!("Service Unavailable")))
    );
}

#[tokio::test]
async fn missing_table_is_rejected_before_sending() {
    let server = MockServer::start().await;
    let request = RemoteRequest::for_key(None, Key::remote("1"));

    let error = store_for(&server).get(&request).await.unwrap_err();

    assert!(matches!(error, RemoteError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let store = HttpRemoteStore::new(HttpRemoteConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
    })
    .unwrap();

    let error = store.get(&orders(Some(Key::remote("1")))).await.unwrap_err();

    assert!(matches!(error, RemoteError::Transport(_)));
}
