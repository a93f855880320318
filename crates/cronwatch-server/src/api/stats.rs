use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::middleware::OwnerId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

/// Read-only overview across the owner's jobs.
#[derive(Serialize, ToSchema)]
pub struct OverviewResponse {
    pub total_jobs: u64,
    pub total_runs: u64,
    pub total_alerts: u64,
    pub success_runs: u64,
    /// Percentage of runs with status `ok`
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}

/// Overview stats for the calling owner.
#[utoipa::path(
    get,
    path = "/v1/stats/overview",
    tag = "Stats",
    responses(
        (status = 200, description = "Overview stats", body = OverviewResponse),
        (status = 401, description = "Missing owner identity", body = crate::api::ApiError)
    )
)]
pub async fn overview(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
) -> Response {
    match state.store.overview_stats(&owner).await {
        Ok(stats) => success_response(
            StatusCode::OK,
            &trace_id,
            OverviewResponse {
                total_jobs: stats.total_jobs,
                total_runs: stats.total_runs,
                total_alerts: stats.total_alerts,
                success_runs: stats.success_runs,
                success_rate: stats.success_rate,
                avg_duration_ms: stats.avg_duration_ms,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute overview stats");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Read-only per-job run statistics.
#[derive(Serialize, ToSchema)]
pub struct JobStatsResponse {
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_duration_ms: f64,
    /// Nearest-rank percentile over recorded durations
    pub p50_duration_ms: f64,
    pub p95_duration_ms: f64,
}

/// Per-job run statistics.
#[utoipa::path(
    get,
    path = "/v1/stats/jobs/{id}",
    tag = "Stats",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job stats", body = JobStatsResponse),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn job_stats(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_job(&id, &owner).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Job not found")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to verify job ownership");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }

    match state.store.job_stats(&id).await {
        Ok(stats) => success_response(
            StatusCode::OK,
            &trace_id,
            JobStatsResponse {
                run_count: stats.run_count,
                success_count: stats.success_count,
                failure_count: stats.failure_count,
                avg_duration_ms: stats.avg_duration_ms,
                p50_duration_ms: stats.p50_duration_ms,
                p95_duration_ms: stats.p95_duration_ms,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute job stats");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}
