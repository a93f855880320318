use crate::entities::{alert, job, job_run};
use crate::store::{MonitorStore, NewJob};
use chrono::{Duration, Utc};
use cronwatch_common::types::{PingReport, Severity};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde_json::json;
use tempfile::TempDir;

async fn setup() -> (TempDir, MonitorStore) {
    cronwatch_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/cronwatch.db?mode=rwc", dir.path().display());
    let store = MonitorStore::new(&url).await.unwrap();
    (dir, store)
}

fn new_job(name: &str) -> NewJob {
    NewJob {
        name: name.to_string(),
        ping_key: format!("key-{name}"),
        schedule: "*/5 * * * *".to_string(),
        timezone: "UTC".to_string(),
        grace_minutes: 5,
        owner_id: "owner-1".to_string(),
    }
}

fn report(status: &str, metrics: serde_json::Value) -> PingReport {
    PingReport {
        status: status.to_string(),
        duration_ms: 1200,
        metrics: metrics.as_object().cloned().unwrap_or_default(),
        stderr: String::new(),
    }
}

/// Shift a run's created_at into the past. Test fixture only; runs are
/// immutable in production code.
async fn backdate_run(store: &MonitorStore, run_id: &str, secs: i64) {
    let m = job_run::Entity::find_by_id(run_id)
        .one(store.db())
        .await
        .unwrap()
        .unwrap();
    let mut am: job_run::ActiveModel = m.into();
    am.created_at = Set((Utc::now() - Duration::seconds(secs)).fixed_offset());
    am.update(store.db()).await.unwrap();
}

async fn backdate_job(store: &MonitorStore, job_id: &str, secs: i64) {
    let m = job::Entity::find_by_id(job_id)
        .one(store.db())
        .await
        .unwrap()
        .unwrap();
    let mut am: job::ActiveModel = m.into();
    am.created_at = Set((Utc::now() - Duration::seconds(secs)).fixed_offset());
    am.update(store.db()).await.unwrap();
}

async fn backdate_alert(store: &MonitorStore, alert_id: &str, secs: i64) {
    let m = alert::Entity::find_by_id(alert_id)
        .one(store.db())
        .await
        .unwrap()
        .unwrap();
    let mut am: alert::ActiveModel = m.into();
    am.sent_at = Set((Utc::now() - Duration::seconds(secs)).fixed_offset());
    am.update(store.db()).await.unwrap();
}

#[tokio::test]
async fn job_round_trip_and_ping_key_lookup() {
    let (_dir, store) = setup().await;

    let job = store.insert_job(&new_job("nightly-etl")).await.unwrap();
    assert_eq!(job.name, "nightly-etl");

    let by_key = store
        .get_job_by_ping_key("key-nightly-etl")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_key.id, job.id);

    assert!(store
        .get_job_by_ping_key("no-such-key")
        .await
        .unwrap()
        .is_none());

    // Owner scoping
    assert!(store.get_job(&job.id, "owner-1").await.unwrap().is_some());
    assert!(store.get_job(&job.id, "owner-2").await.unwrap().is_none());
}

#[tokio::test]
async fn metrics_survive_the_json_column_unchanged() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    let metrics = json!({
        "rows": 500,
        "ratio": 0.25,
        "big": 9007199254740993i64,
        "note": "partial load",
        "nested": {"skipped": [1, 2, 3]}
    });
    let run = store
        .insert_run(&job.id, &report("ok", metrics.clone()))
        .await
        .unwrap();

    let stored = store.latest_run(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.id, run.id);
    assert_eq!(
        serde_json::Value::Object(stored.metrics),
        metrics,
        "metrics map must round-trip without key loss or numeric drift"
    );
}

#[tokio::test]
async fn recent_run_window_tracks_the_store_clock() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    assert!(!store.recent_run_exists(&job.id, 10).await.unwrap());

    let run = store
        .insert_run(&job.id, &PingReport::default())
        .await
        .unwrap();
    assert!(store.recent_run_exists(&job.id, 10).await.unwrap());

    backdate_run(&store, &run.id, 60).await;
    assert!(!store.recent_run_exists(&job.id, 10).await.unwrap());

    let elapsed = store
        .seconds_since_last_run(&job.id)
        .await
        .unwrap()
        .unwrap();
    assert!((58..=62).contains(&elapsed), "elapsed was {elapsed}");
}

#[tokio::test]
async fn seconds_since_creation_for_silent_jobs() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("silent")).await.unwrap();

    assert!(store.seconds_since_last_run(&job.id).await.unwrap().is_none());

    backdate_job(&store, &job.id, 180).await;
    let elapsed = store
        .seconds_since_job_created(&job.id)
        .await
        .unwrap()
        .unwrap();
    assert!((178..=182).contains(&elapsed), "elapsed was {elapsed}");
}

#[tokio::test]
async fn last_successful_run_skips_failures() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    let ok_old = store
        .insert_run(&job.id, &report("ok", json!({"rows": 10})))
        .await
        .unwrap();
    backdate_run(&store, &ok_old.id, 300).await;

    let failed = store
        .insert_run(&job.id, &report("fail", json!({})))
        .await
        .unwrap();
    backdate_run(&store, &failed.id, 120).await;

    let current = store
        .insert_run(&job.id, &report("fail", json!({})))
        .await
        .unwrap();

    let last_good = store
        .last_successful_run_before(&job.id, current.created_at)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last_good.id, ok_old.id);

    // A job that never succeeded has no last-good run.
    let job2 = store.insert_job(&new_job("never-good")).await.unwrap();
    let run2 = store
        .insert_run(&job2.id, &report("fail", json!({})))
        .await
        .unwrap();
    assert!(store
        .last_successful_run_before(&job2.id, run2.created_at)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn missed_alert_dedup_window() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();
    let msg = "Job did not run within expected window";

    assert!(!store.recent_alert_exists(&job.id, msg, 120).await.unwrap());

    let alert = store.insert_alert(&job.id, None, msg).await.unwrap();
    assert!(alert.run_id.is_none());
    assert!(store.recent_alert_exists(&job.id, msg, 120).await.unwrap());

    // A different message never matches the dedup key.
    assert!(!store
        .recent_alert_exists(&job.id, "some other condition", 120)
        .await
        .unwrap());

    // Once the window has fully elapsed the alert no longer suppresses.
    backdate_alert(&store, &alert.id, 150).await;
    assert!(!store.recent_alert_exists(&job.id, msg, 120).await.unwrap());
}

#[tokio::test]
async fn rules_crud_round_trip() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    let rule = store
        .insert_rule(&job.id, "rows", ">", 100.0, Severity::Warning)
        .await
        .unwrap();
    let listed = store.rules_for_job(&job.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].operator, ">");
    assert_eq!(listed[0].severity, Severity::Warning);

    assert!(store.delete_rule(&rule.id).await.unwrap());
    assert!(!store.delete_rule(&rule.id).await.unwrap());
    assert!(store.rules_for_job(&job.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_job_cascades_and_respects_ownership() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    let run = store
        .insert_run(&job.id, &PingReport::default())
        .await
        .unwrap();
    store
        .insert_rule(&job.id, "rows", ">", 100.0, Severity::Critical)
        .await
        .unwrap();
    store
        .insert_alert(&job.id, Some(&run.id), "rows > 100 (actual: 500)")
        .await
        .unwrap();

    // Wrong owner: nothing happens.
    assert!(!store.delete_job(&job.id, "intruder").await.unwrap());
    assert!(store.latest_run(&job.id).await.unwrap().is_some());

    assert!(store.delete_job(&job.id, "owner-1").await.unwrap());
    assert!(store.get_job_by_ping_key("key-etl").await.unwrap().is_none());
    assert!(store.latest_run(&job.id).await.unwrap().is_none());
    assert!(store.rules_for_job(&job.id).await.unwrap().is_empty());
    assert!(store.list_alerts(&job.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn stats_reflect_recorded_runs() {
    let (_dir, store) = setup().await;
    let job = store.insert_job(&new_job("etl")).await.unwrap();

    for (status, duration) in [("ok", 100), ("ok", 200), ("fail", 400), ("ok", 300)] {
        let mut rep = PingReport {
            status: status.to_string(),
            ..PingReport::default()
        };
        rep.duration_ms = duration;
        store.insert_run(&job.id, &rep).await.unwrap();
    }

    let stats = store.job_stats(&job.id).await.unwrap();
    assert_eq!(stats.run_count, 4);
    assert_eq!(stats.success_count, 3);
    assert_eq!(stats.failure_count, 1);
    assert_eq!(stats.avg_duration_ms, 250.0);
    assert_eq!(stats.p50_duration_ms, 200.0);
    assert_eq!(stats.p95_duration_ms, 400.0);

    let overview = store.overview_stats("owner-1").await.unwrap();
    assert_eq!(overview.total_jobs, 1);
    assert_eq!(overview.total_runs, 4);
    assert_eq!(overview.success_runs, 3);
    assert_eq!(overview.success_rate, 75.0);

    // Other owners see nothing.
    let empty = store.overview_stats("owner-2").await.unwrap();
    assert_eq!(empty.total_jobs, 0);
    assert_eq!(empty.total_runs, 0);

    let no_runs = store.job_stats("missing-job").await.unwrap();
    assert_eq!(no_runs.run_count, 0);
    assert_eq!(no_runs.avg_duration_ms, 0.0);
}
