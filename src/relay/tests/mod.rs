use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::types::{JobId, JobRequest, Stage};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


/// A job request pointing at `server` for both the source file and the callback
fn request_for(server: &MockServer, source: &str, correlation_id: &str) -> JobRequest {
    JobRequest {
        source_url: format!("{}{}", server.uri(), source),
        display_name: "a.pdf".to_string(),
        target_container: "folder123".to_string(),
        correlation_id: correlation_id.to_string(),
        callback_url: format!("{}/hook", server.uri()),
    }
}

async fn mount_source(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn is_done(id: JobId) -> impl Fn(&Event) -> bool {
    move |event| matches!(event, Event::StageChanged { id: i, stage: Stage::Done } if *i == id)
}

/// Wait until every job in `ids` reached `Done`, in whatever order they finish
async fn wait_for_all_done(events: &mut tokio::sync::broadcast::Receiver<Event>, ids: &[JobId]) {
    let expected: HashSet<JobId> = ids.iter().copied().collect();
    let mut finished = HashSet::new();

    tokio::time::timeout(Duration::from_secs(10), async {
        while !expected.is_subset(&finished) {
            if let Event::StageChanged {
                id,
                stage: Stage::Done,
            } = events.recv().await.unwrap()
            {
                finished.insert(id);
            }
        }
    })
    .await
    .expect("timed out waiting for jobs to finish");
}

/// JSON bodies posted to the callback route so far
async fn callback_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/hook")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

async fn wait_until_idle(relay: &RelayService) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while relay.active_jobs() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("jobs did not release their slots");
}
