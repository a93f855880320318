use chrono::{DateTime, Utc};
use cronwatch_common::types::{Job, JobRun, Rule};
use cronwatch_notify::manager::NotificationManager;
use cronwatch_notify::message::Notification;
use cronwatch_storage::MonitorStore;

/// The fixed missed-run alert message. Also the dedup key: a second alert
/// with this text is suppressed while one already exists inside the
/// threshold window.
pub const MISSED_RUN_MESSAGE: &str = "Job did not run within expected window";

/// Persists a rule-violation alert, then fans out notifications.
///
/// The alert row is the source of truth: if the write fails nothing is
/// sent. Channel delivery is detached and best-effort.
pub async fn dispatch_rule_alert(
    store: &MonitorStore,
    notifier: &NotificationManager,
    job: &Job,
    run: &JobRun,
    rule: &Rule,
    actual: f64,
) {
    let message = format!(
        "{} {} {} (actual: {})",
        rule.metric_name, rule.operator, rule.threshold_value, actual
    );

    let alert = match store.insert_alert(&job.id, Some(&run.id), &message).await {
        Ok(alert) => alert,
        Err(e) => {
            tracing::error!(
                job = %job.name,
                error = %e,
                "Failed to save alert; notification skipped"
            );
            return;
        }
    };
    tracing::info!(alert_id = %alert.id, job = %job.name, message = %message, "Alert saved");

    // Best-effort context lookup; a failure degrades to "never succeeded".
    let last_good = match store
        .last_successful_run_before(&job.id, run.created_at)
        .await
    {
        Ok(last_good) => last_good,
        Err(e) => {
            tracing::warn!(job = %job.name, error = %e, "Failed to fetch last successful run");
            None
        }
    };

    notifier.dispatch(&Notification::RuleViolation {
        job: job.clone(),
        run: run.clone(),
        metric_name: rule.metric_name.clone(),
        operator: rule.operator.clone(),
        threshold: rule.threshold_value,
        actual,
        message,
        last_good,
    });
}

/// Persists a missed-run alert unless one was already sent for this job
/// within the most recent threshold-length window, then fans out.
pub async fn dispatch_missed_run_alert(
    store: &MonitorStore,
    notifier: &NotificationManager,
    job: &Job,
    last_known_run: Option<DateTime<Utc>>,
    threshold_secs: u64,
) {
    match store
        .recent_alert_exists(&job.id, MISSED_RUN_MESSAGE, threshold_secs)
        .await
    {
        Ok(true) => {
            tracing::debug!(job = %job.name, "Duplicate missed-run alert suppressed");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            // Dedup is best-effort; a failed check falls through to alerting.
            tracing::warn!(job = %job.name, error = %e, "Alert dedup check failed; proceeding");
        }
    }

    if let Err(e) = store.insert_alert(&job.id, None, MISSED_RUN_MESSAGE).await {
        tracing::error!(
            job = %job.name,
            error = %e,
            "Failed to save missed-run alert; notification skipped"
        );
        return;
    }
    tracing::info!(job = %job.name, "Missed run detected, alert saved");

    notifier.dispatch(&Notification::MissedRun {
        job: job.clone(),
        message: MISSED_RUN_MESSAGE.to_string(),
        last_known_run,
    });
}
