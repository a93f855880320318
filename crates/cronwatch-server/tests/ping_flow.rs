mod common;

use axum::http::StatusCode;
use common::{build_test_context, build_test_context_with, data, send, wait_for_alerts, OWNER};
use cronwatch_server::config::ServerConfig;
use serde_json::json;
use std::time::Duration;

async fn create_job(ctx: &common::TestContext, name: &str) -> (String, String) {
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/v1/jobs",
        Some(OWNER),
        Some(json!({"name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job = data(&body);
    (
        job["id"].as_str().unwrap().to_string(),
        job["ping_key"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn unknown_ping_key_is_not_found() {
    let ctx = build_test_context().await.unwrap();
    let (status, body) = send(&ctx.app, "POST", "/ping/no-such-key", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["err_msg"], "Job not found");
}

#[tokio::test]
async fn empty_body_is_an_implicit_success_heartbeat() {
    let ctx = build_test_context().await.unwrap();
    let (job_id, ping_key) = create_job(&ctx, "heartbeat-only").await;

    let (status, _) = send(&ctx.app, "POST", &format!("/ping/{ping_key}"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let runs = ctx.state.store.list_runs(&job_id, 50).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "ok");
    assert!(runs[0].metrics.is_empty());
}

#[tokio::test]
async fn malformed_body_is_rejected_without_a_row() {
    let ctx = build_test_context().await.unwrap();
    let (job_id, ping_key) = create_job(&ctx, "strict").await;

    let (status, body) = send(
        &ctx.app,
        "POST",
        &format!("/ping/{ping_key}"),
        None,
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_msg"], "Invalid JSON");

    let runs = ctx.state.store.list_runs(&job_id, 50).await.unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn duplicate_ping_suppressed_within_window() {
    // The guard is check-then-insert, not one transaction: only strictly
    // sequential duplicates are guaranteed suppressed. Concurrent pings
    // racing through the check is accepted behavior.
    let mut config = ServerConfig::default();
    config.ping.duplicate_window_secs = 2;
    let ctx = build_test_context_with(config).await.unwrap();
    let (job_id, ping_key) = create_job(&ctx, "retried").await;
    let uri = format!("/ping/{ping_key}");

    let report = json!({"status": "ok", "duration_ms": 5, "metrics": {"rows": 1}});
    let (status, _) = send(&ctx.app, "POST", &uri, None, Some(report.clone())).await;
    assert_eq!(status, StatusCode::OK);

    // The retry must still look like success to the sender.
    let (status, _) = send(&ctx.app, "POST", &uri, None, Some(report.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let runs = ctx.state.store.list_runs(&job_id, 50).await.unwrap();
    assert_eq!(runs.len(), 1, "duplicate inside the window wrote a row");

    // Past the window, the next report is a fresh run.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let (status, _) = send(&ctx.app, "POST", &uri, None, Some(report)).await;
    assert_eq!(status, StatusCode::OK);

    let runs = ctx.state.store.list_runs(&job_id, 50).await.unwrap();
    assert_eq!(runs.len(), 2);
}

#[tokio::test]
async fn violated_rule_produces_one_alert() {
    let mut config = ServerConfig::default();
    config.ping.duplicate_window_secs = 0; // every report records
    let ctx = build_test_context_with(config).await.unwrap();
    let (job_id, ping_key) = create_job(&ctx, "etl").await;
    let uri = format!("/ping/{ping_key}");

    let (status, _) = send(
        &ctx.app,
        "POST",
        &format!("/v1/jobs/{job_id}/rules"),
        Some(OWNER),
        Some(json!({
            "metric_name": "rows",
            "operator": ">",
            "threshold_value": 100.0,
            "severity": "warning"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Within threshold: no alert.
    let (status, _) = send(
        &ctx.app,
        "POST",
        &uri,
        None,
        Some(json!({"status": "ok", "metrics": {"rows": 50}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(ctx
        .state
        .store
        .list_alerts(&job_id, 50)
        .await
        .unwrap()
        .is_empty());

    // Above threshold: one alert embedding the actual value.
    let (status, _) = send(
        &ctx.app,
        "POST",
        &uri,
        None,
        Some(json!({"status": "ok", "metrics": {"rows": 500}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let alerts = wait_for_alerts(&ctx.state, &job_id, 1).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "rows > 100 (actual: 500)");
    assert!(alerts[0].run_id.is_some());
}

#[tokio::test]
async fn missing_metric_never_alerts() {
    let mut config = ServerConfig::default();
    config.ping.duplicate_window_secs = 0;
    let ctx = build_test_context_with(config).await.unwrap();
    let (job_id, ping_key) = create_job(&ctx, "etl").await;

    let (status, _) = send(
        &ctx.app,
        "POST",
        &format!("/v1/jobs/{job_id}/rules"),
        Some(OWNER),
        Some(json!({
            "metric_name": "rows",
            "operator": ">",
            "threshold_value": 0.0,
            "severity": "critical"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &ctx.app,
        "POST",
        &format!("/ping/{ping_key}"),
        None,
        Some(json!({"status": "ok", "metrics": {"latency_ms": 9}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(ctx
        .state
        .store
        .list_alerts(&job_id, 50)
        .await
        .unwrap()
        .is_empty());
}
