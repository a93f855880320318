use chrono::{DateTime, SecondsFormat, Utc};
use cronwatch_common::types::{Job, JobRun};

/// A fired alert, carried with enough context for every channel to render
/// its own view. Channels receive read-only copies; nothing here is shared
/// with the request path that produced the alert.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A reported metric failed an operator/threshold comparison.
    RuleViolation {
        job: Job,
        run: JobRun,
        metric_name: String,
        operator: String,
        threshold: f64,
        actual: f64,
        /// The persisted alert message, e.g. `rows > 100 (actual: 500)`.
        message: String,
        /// Most recent prior successful run, when one exists.
        last_good: Option<JobRun>,
    },
    /// A job failed to report within the liveness threshold.
    MissedRun {
        job: Job,
        message: String,
        /// When the job last reported; `None` when it never ran.
        last_known_run: Option<DateTime<Utc>>,
    },
}

impl Notification {
    pub fn job(&self) -> &Job {
        match self {
            Notification::RuleViolation { job, .. } => job,
            Notification::MissedRun { job, .. } => job,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Notification::RuleViolation { message, .. } => message,
            Notification::MissedRun { message, .. } => message,
        }
    }
}

pub(crate) fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// "Last known good" block for alert emails. Absence of a prior success is
/// an explicit string, never an error.
pub(crate) fn last_good_block(last_good: Option<&JobRun>) -> String {
    match last_good {
        Some(run) => {
            let metrics = serde_json::to_string(&run.metrics).unwrap_or_else(|_| "{}".to_string());
            format!(
                "Time: {}\nDuration: {}ms\nMetrics: {}",
                rfc3339(run.created_at),
                run.duration_ms,
                metrics
            )
        }
        None => "None found (this job has never succeeded)".to_string(),
    }
}
