use super::*;
use crate::relay::test_helpers::{MockBackend, MockOutcome, create_test_relay, wait_for_event};
use crate::types::Event;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt; // for oneshot()
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


const API_KEY: &str = "test-key";

/// Router over a relay with a mock backend that always succeeds
async fn create_test_app(max_concurrent_jobs: usize) -> (Router, Arc<RelayService>, tempfile::TempDir) {
    let backend = Arc::new(MockBackend::new(MockOutcome::Succeed("drive-file-1")));
    let (relay, temp_dir) = create_test_relay(backend, max_concurrent_jobs).await;
    let relay = Arc::new(relay);
    let config = relay.get_config();
    (create_router(relay.clone(), config), relay, temp_dir)
}

fn upload_request(api_key: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/gdrive-upload")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(body.into()).unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_serves_and_shuts_down() {
    let (_app, relay, _temp_dir) = create_test_app(2).await;

    let mut config = (*relay.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // OS assigns a free port
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(relay, config, async {
        stop_rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (_app, relay, _temp_dir) = create_test_app(2).await;

    let mut config = (*relay.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(relay, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_disabled_by_default() {
    let (app, _relay, _temp_dir) = create_test_app(2).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_swagger_ui_only_when_enabled() {
    let (app, relay, _temp_dir) = create_test_app(2).await;

    let request = || {
        Request::builder()
            .uri("/swagger-ui/")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut config = (*relay.get_config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(relay, Arc::new(config));

    let response = app.oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
