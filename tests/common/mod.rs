//! Common test utilities for drive-relay integration tests

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drive_relay::{Config, Event, JobId, Stage};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::MockServer;

/// RSA key used to sign token assertions in tests
pub const TEST_PRIVATE_KEY: &str =
    include_str!("../../src/storage/testdata/test_service_account_key.pem");

pub const API_KEY: &str = "integration-key";

/// Base64 service account JSON whose token endpoint is `server`
pub fn encoded_credentials(server: &MockServer) -> String {
    let json = serde_json::json!({
        "type": "service_account",
        "client_email": "relay@project.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": format!("{}/token", server.uri()),
    });
    STANDARD.encode(json.to_string())
}

/// Full configuration pointing every outbound call at `server`
pub fn config_for(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.staging.staging_dir = temp_dir.path().join("staging");
    config.staging.fetch_timeout = Some(Duration::from_secs(10));
    config.storage.credentials = encoded_credentials(server);
    config.storage.delegated_user = "owner@example.com".to_string();
    config.storage.api_base = server.uri();
    config.notifications.timeout = Duration::from_secs(5);
    config.server.api.api_key = Some(API_KEY.to_string());
    config
}

/// Wait until any job reaches its terminal stage
pub async fn wait_for_any_done(rx: &mut broadcast::Receiver<Event>) -> JobId {
    tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            match rx.recv().await {
                Ok(Event::StageChanged { id, stage: Stage::Done }) => return id,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("no job finished in time")
}

/// JSON bodies POSTed to `route` on `server`
pub async fn posted_bodies(server: &MockServer, route: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == route)
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}

/// Entries left in the staging directory
pub fn staged_entries(config: &Config) -> usize {
    std::fs::read_dir(&config.staging.staging_dir)
        .map(|dir| dir.count())
        .unwrap_or(0)
}
