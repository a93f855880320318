use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A monitored unit of work. Created by the job-management API; the
/// monitoring engine only ever reads it.
///
/// `ping_key` is an unguessable capability token used as the ping URL path
/// segment; it is unique across all jobs and never reused. `schedule`,
/// `timezone` and `grace_minutes` are advisory metadata — the scanner
/// applies one global liveness threshold regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub ping_key: String,
    pub schedule: String,
    pub timezone: String,
    pub grace_minutes: i32,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// One reported execution of a job. Immutable once recorded; `created_at`
/// is the authoritative "occurred at" marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: String,
    pub job_id: String,
    pub status: String,
    pub duration_ms: i64,
    pub metrics: Map<String, Value>,
    pub stderr: String,
    pub created_at: DateTime<Utc>,
}

/// A threshold check scoped to one job. `operator` is one of
/// `==`, `!=`, `<`, `>`; evaluation only applies to runs recorded after
/// the rule exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub job_id: String,
    pub metric_name: String,
    pub operator: String,
    pub threshold_value: f64,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// An immutable record of a detected problem. `run_id` is absent for
/// missed-run alerts. Doubles as the audit trail and the dedup key for
/// repeat missed-run alerting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub job_id: String,
    pub run_id: Option<String>,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Inbound ping body. Every field is optional on the wire; an absent body
/// is an implicit success heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingReport {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub stderr: String,
}

fn default_status() -> String {
    "ok".to_string()
}

impl Default for PingReport {
    fn default() -> Self {
        Self {
            status: default_status(),
            duration_ms: 0,
            metrics: Map::new(),
            stderr: String::new(),
        }
    }
}

/// Rule severity label.
///
/// # Examples
///
/// ```
/// use cronwatch_common::types::Severity;
///
/// let sev: Severity = "critical".parse().unwrap();
/// assert_eq!(sev, Severity::Critical);
/// assert_eq!(sev.to_string(), "critical");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}
