use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, PaginatorTrait, QueryFilter, Statement};
use serde::Serialize;

use crate::entities::job_run;
use crate::store::MonitorStore;

/// Read-only overview across all of an owner's jobs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverviewStats {
    pub total_jobs: u64,
    pub total_runs: u64,
    pub total_alerts: u64,
    pub success_runs: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}

/// Read-only per-job run statistics. Percentiles are nearest-rank over
/// the job's recorded durations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_duration_ms: f64,
    pub p50_duration_ms: f64,
    pub p95_duration_ms: f64,
}

fn nearest_rank(sorted: &[i64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1] as f64
}

impl MonitorStore {
    pub async fn overview_stats(&self, owner_id: &str) -> Result<OverviewStats> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT
                (SELECT COUNT(*) FROM jobs WHERE owner_id = ?) AS total_jobs,
                (SELECT COUNT(*) FROM job_runs WHERE job_id IN (SELECT id FROM jobs WHERE owner_id = ?)) AS total_runs,
                (SELECT COUNT(*) FROM alerts WHERE job_id IN (SELECT id FROM jobs WHERE owner_id = ?)) AS total_alerts,
                (SELECT COUNT(*) FROM job_runs WHERE status = 'ok' AND job_id IN (SELECT id FROM jobs WHERE owner_id = ?)) AS success_runs,
                (SELECT AVG(duration_ms) FROM job_runs WHERE job_id IN (SELECT id FROM jobs WHERE owner_id = ?)) AS avg_duration_ms",
            [
                owner_id.into(),
                owner_id.into(),
                owner_id.into(),
                owner_id.into(),
                owner_id.into(),
            ],
        );
        let row = self
            .db
            .query_one(stmt)
            .await?
            .ok_or_else(|| anyhow::anyhow!("overview stats query returned no row"))?;

        let total_jobs: i64 = row.try_get("", "total_jobs")?;
        let total_runs: i64 = row.try_get("", "total_runs")?;
        let total_alerts: i64 = row.try_get("", "total_alerts")?;
        let success_runs: i64 = row.try_get("", "success_runs")?;
        let avg_duration_ms: Option<f64> = row.try_get("", "avg_duration_ms")?;

        let success_rate = if total_runs > 0 {
            success_runs as f64 / total_runs as f64 * 100.0
        } else {
            0.0
        };

        Ok(OverviewStats {
            total_jobs: total_jobs as u64,
            total_runs: total_runs as u64,
            total_alerts: total_alerts as u64,
            success_runs: success_runs as u64,
            success_rate,
            avg_duration_ms: avg_duration_ms.unwrap_or(0.0),
        })
    }

    pub async fn job_stats(&self, job_id: &str) -> Result<JobStats> {
        let run_count = job_run::Entity::find()
            .filter(job_run::Column::JobId.eq(job_id))
            .count(self.db())
            .await?;
        if run_count == 0 {
            return Ok(JobStats::default());
        }

        let success_count = job_run::Entity::find()
            .filter(job_run::Column::JobId.eq(job_id))
            .filter(job_run::Column::Status.eq("ok"))
            .count(self.db())
            .await?;

        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT duration_ms FROM job_runs WHERE job_id = ? ORDER BY duration_ms ASC",
            [job_id.into()],
        );
        let rows = self.db.query_all(stmt).await?;
        let durations: Vec<i64> = rows
            .iter()
            .map(|r| r.try_get::<i64>("", "duration_ms"))
            .collect::<Result<_, _>>()?;

        let avg = durations.iter().sum::<i64>() as f64 / durations.len() as f64;

        Ok(JobStats {
            run_count,
            success_count,
            failure_count: run_count - success_count,
            avg_duration_ms: avg,
            p50_duration_ms: nearest_rank(&durations, 0.50),
            p95_duration_ms: nearest_rank(&durations, 0.95),
        })
    }
}
