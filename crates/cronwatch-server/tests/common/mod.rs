#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use cronwatch_common::types::Alert;
use cronwatch_notify::manager::NotificationManager;
use cronwatch_server::app;
use cronwatch_server::config::ServerConfig;
use cronwatch_server::state::AppState;
use cronwatch_storage::MonitorStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const OWNER: &str = "owner-1";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(ServerConfig::default()).await
}

pub async fn build_test_context_with(config: ServerConfig) -> Result<TestContext> {
    cronwatch_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}/cronwatch.db?mode=rwc", temp_dir.path().display());
    let store = Arc::new(MonitorStore::new(&url).await?);

    // No channels configured: fan-out is a no-op in tests.
    let notifier = Arc::new(NotificationManager::new(vec![]));

    let state = AppState {
        store,
        notifier,
        config: Arc::new(config),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

/// Sends one request through the full router and returns status + parsed
/// JSON body (or Null for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    owner: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("x-owner-id", owner);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Unwraps the `data` field of a success envelope.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["err_code"], 0, "expected success envelope: {body}");
    &body["data"]
}

/// Polls the store until the job has at least `count` alerts, or panics
/// after ~2 seconds. The rule pass runs on a detached task, so tests must
/// wait rather than assert immediately.
pub async fn wait_for_alerts(state: &AppState, job_id: &str, count: usize) -> Vec<Alert> {
    for _ in 0..40 {
        let alerts = state.store.list_alerts(job_id, 50).await.unwrap();
        if alerts.len() >= count {
            return alerts;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} never reached {count} alert(s)");
}
