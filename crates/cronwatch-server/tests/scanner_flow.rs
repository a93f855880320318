mod common;

use common::build_test_context;
use cronwatch_common::types::PingReport;
use cronwatch_server::alerting::MISSED_RUN_MESSAGE;
use cronwatch_server::scanner::MissedRunScanner;
use cronwatch_storage::NewJob;
use std::time::Duration;

fn new_job(name: &str) -> NewJob {
    NewJob {
        name: name.to_string(),
        ping_key: format!("key-{name}"),
        schedule: String::new(),
        timezone: String::new(),
        grace_minutes: 0,
        owner_id: "owner-1".to_string(),
    }
}

// Thresholds here are scaled down from the operational 2 minutes so the
// same elapsed-vs-threshold logic can be exercised in seconds.

#[tokio::test]
async fn silent_job_gets_one_deduplicated_alert() {
    let ctx = build_test_context().await.unwrap();
    let store = ctx.state.store.clone();
    let job = store.insert_job(&new_job("silent")).await.unwrap();

    let scanner = MissedRunScanner::new(store.clone(), ctx.state.notifier.clone(), 30, 1);

    // Not yet past the threshold: nothing fires.
    scanner.sweep().await.unwrap();
    assert!(store.list_alerts(&job.id, 50).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(2200)).await;

    // Past the threshold, never ran: exactly one alert, no run reference.
    scanner.sweep().await.unwrap();
    let alerts = store.list_alerts(&job.id, 50).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, MISSED_RUN_MESSAGE);
    assert!(alerts[0].run_id.is_none());

    // Repeat sweeps inside one threshold window stay suppressed.
    scanner.sweep().await.unwrap();
    scanner.sweep().await.unwrap();
    assert_eq!(store.list_alerts(&job.id, 50).await.unwrap().len(), 1);

    // Once the window elapses the condition alerts again.
    tokio::time::sleep(Duration::from_millis(1600)).await;
    scanner.sweep().await.unwrap();
    assert_eq!(store.list_alerts(&job.id, 50).await.unwrap().len(), 2);
}

#[tokio::test]
async fn recently_reporting_job_is_left_alone() {
    let ctx = build_test_context().await.unwrap();
    let store = ctx.state.store.clone();
    let job = store.insert_job(&new_job("lively")).await.unwrap();
    store.insert_run(&job.id, &PingReport::default()).await.unwrap();

    let scanner = MissedRunScanner::new(store.clone(), ctx.state.notifier.clone(), 30, 120);
    scanner.sweep().await.unwrap();

    assert!(store.list_alerts(&job.id, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn job_that_stopped_reporting_is_flagged() {
    let ctx = build_test_context().await.unwrap();
    let store = ctx.state.store.clone();
    let job = store.insert_job(&new_job("stalled")).await.unwrap();
    store.insert_run(&job.id, &PingReport::default()).await.unwrap();

    let scanner = MissedRunScanner::new(store.clone(), ctx.state.notifier.clone(), 30, 1);

    tokio::time::sleep(Duration::from_millis(2200)).await;
    scanner.sweep().await.unwrap();

    let alerts = store.list_alerts(&job.id, 50).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, MISSED_RUN_MESSAGE);
}

#[tokio::test]
async fn one_stale_job_does_not_stop_the_sweep() {
    let ctx = build_test_context().await.unwrap();
    let store = ctx.state.store.clone();

    let stale_a = store.insert_job(&new_job("stale-a")).await.unwrap();
    let stale_b = store.insert_job(&new_job("stale-b")).await.unwrap();

    let scanner = MissedRunScanner::new(store.clone(), ctx.state.notifier.clone(), 30, 1);
    tokio::time::sleep(Duration::from_millis(2200)).await;

    // Delete one job mid-window; its check degrades gracefully and the
    // other job still gets its alert.
    assert!(store.delete_job(&stale_a.id, "owner-1").await.unwrap());
    scanner.sweep().await.unwrap();

    assert!(store.list_alerts(&stale_a.id, 50).await.unwrap().is_empty());
    assert_eq!(store.list_alerts(&stale_b.id, 50).await.unwrap().len(), 1);
}
