use anyhow::Result;
use chrono::{DateTime, Utc};
use cronwatch_common::types::{JobRun, PingReport};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde_json::Value;

use crate::entities::job_run;
use crate::store::MonitorStore;

fn to_run(m: job_run::Model) -> JobRun {
    let metrics = match m.metrics {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    JobRun {
        id: m.id,
        job_id: m.job_id,
        status: m.status,
        duration_ms: m.duration_ms,
        metrics,
        stderr: m.stderr,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl MonitorStore {
    /// Persists one run report as a new immutable record and returns it
    /// with the generated id and server timestamp. The row is never
    /// updated afterwards.
    pub async fn insert_run(&self, job_id: &str, report: &PingReport) -> Result<JobRun> {
        let now = Utc::now().fixed_offset();
        let am = job_run::ActiveModel {
            id: Set(cronwatch_common::id::next_id()),
            job_id: Set(job_id.to_string()),
            status: Set(report.status.clone()),
            duration_ms: Set(report.duration_ms),
            metrics: Set(Value::Object(report.metrics.clone())),
            stderr: Set(report.stderr.clone()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_run(model))
    }

    pub async fn latest_run(&self, job_id: &str) -> Result<Option<JobRun>> {
        let model = job_run::Entity::find()
            .filter(job_run::Column::JobId.eq(job_id))
            .order_by(job_run::Column::CreatedAt, Order::Desc)
            .one(self.db())
            .await?;
        Ok(model.map(to_run))
    }

    /// Whether any run for the job was recorded within the trailing
    /// `window_secs` window, measured on the store's clock. This is the
    /// idempotency guard's check half; the insert is a separate statement,
    /// so two concurrent pings can both see `false` here.
    pub async fn recent_run_exists(&self, job_id: &str, window_secs: u64) -> Result<bool> {
        let Some(latest) = self.latest_run(job_id).await? else {
            return Ok(false);
        };
        let now = self.clock_now().await?;
        Ok(now - latest.created_at.timestamp() < window_secs as i64)
    }

    /// Seconds elapsed since the job's most recent run, on the store's
    /// clock. `None` when the job has never reported.
    pub async fn seconds_since_last_run(&self, job_id: &str) -> Result<Option<i64>> {
        let Some(latest) = self.latest_run(job_id).await? else {
            return Ok(None);
        };
        let now = self.clock_now().await?;
        Ok(Some(now - latest.created_at.timestamp()))
    }

    /// The most recent run with status `ok` created strictly before
    /// `before`. Gives the "last known good" context for alert emails.
    pub async fn last_successful_run_before(
        &self,
        job_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<JobRun>> {
        let model = job_run::Entity::find()
            .filter(job_run::Column::JobId.eq(job_id))
            .filter(job_run::Column::Status.eq("ok"))
            .filter(job_run::Column::CreatedAt.lt(before.fixed_offset()))
            .order_by(job_run::Column::CreatedAt, Order::Desc)
            .one(self.db())
            .await?;
        Ok(model.map(to_run))
    }

    pub async fn list_runs(&self, job_id: &str, limit: u64) -> Result<Vec<JobRun>> {
        let rows = job_run::Entity::find()
            .filter(job_run::Column::JobId.eq(job_id))
            .order_by(job_run::Column::CreatedAt, Order::Desc)
            .limit(limit)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_run).collect())
    }
}
