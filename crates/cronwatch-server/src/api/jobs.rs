use crate::api::{error_response, success_empty_response, success_response};
use crate::logging::TraceId;
use crate::middleware::OwnerId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use cronwatch_common::types::Job;
use cronwatch_storage::NewJob;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateJobRequest {
    /// Display name
    pub name: String,
    /// Advisory cron expression; not enforced by the scanner
    #[serde(default)]
    pub schedule: String,
    /// Advisory IANA timezone
    #[serde(default)]
    pub timezone: String,
    /// Advisory grace period in minutes
    #[serde(default)]
    pub grace_minutes: i32,
}

#[derive(Serialize, ToSchema)]
pub struct RunSummary {
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub name: String,
    pub ping_key: String,
    /// Full ping URL for this job
    pub ping_url: String,
    pub schedule: String,
    pub timezone: String,
    pub grace_minutes: i32,
    pub created_at: DateTime<Utc>,
    /// Most recent run, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunSummary>,
}

fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

fn to_response(job: Job, host: &str, last_run: Option<RunSummary>) -> JobResponse {
    JobResponse {
        ping_url: format!("http://{host}/ping/{}", job.ping_key),
        id: job.id,
        name: job.name,
        ping_key: job.ping_key,
        schedule: job.schedule,
        timezone: job.timezone,
        grace_minutes: job.grace_minutes,
        created_at: job.created_at,
        last_run,
    }
}

/// Generate a secure random ping key (16 bytes, hex-encoded).
fn generate_ping_key() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a monitored job. The response carries the generated ping key
/// and URL; the key is shown in full only through this API.
#[utoipa::path(
    post,
    path = "/v1/jobs",
    tag = "Jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 401, description = "Missing owner identity", body = crate::api::ApiError)
    )
)]
pub async fn create_job(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateJobRequest>,
) -> impl IntoResponse {
    let new = NewJob {
        name: req.name,
        ping_key: generate_ping_key(),
        schedule: req.schedule,
        timezone: req.timezone,
        grace_minutes: req.grace_minutes,
        owner_id: owner.0.clone(),
    };

    match state.store.insert_job(&new).await {
        Ok(job) => {
            let host = request_host(&headers);
            success_response(
                StatusCode::CREATED,
                &trace_id,
                to_response(job, &host, None),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create job");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// List the owner's jobs, newest first, each with its most recent run.
#[utoipa::path(
    get,
    path = "/v1/jobs",
    tag = "Jobs",
    responses(
        (status = 200, description = "Job list", body = Vec<JobResponse>),
        (status = 401, description = "Missing owner identity", body = crate::api::ApiError)
    )
)]
pub async fn list_jobs(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let jobs = match state.store.list_jobs(&owner).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list jobs");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let host = request_host(&headers);
    let mut items = Vec::with_capacity(jobs.len());
    for job in jobs {
        // Best-effort last-run summary; a failed lookup renders as none.
        let last_run = state
            .store
            .latest_run(&job.id)
            .await
            .ok()
            .flatten()
            .map(|run| RunSummary {
                status: run.status,
                created_at: run.created_at,
            });
        items.push(to_response(job, &host, last_run));
    }

    success_response(StatusCode::OK, &trace_id, items)
}

/// Fetch one job by ID.
#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job detail", body = JobResponse),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn get_job(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    match state.store.get_job(&id, &owner).await {
        Ok(Some(job)) => {
            let host = request_host(&headers);
            success_response(StatusCode::OK, &trace_id, to_response(job, &host, None))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Job not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Delete a job. Cascades to its runs, rules and alerts.
#[utoipa::path(
    delete,
    path = "/v1/jobs/{id}",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job deleted"),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn delete_job(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.delete_job(&id, &owner).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Job deleted"),
        Ok(false) => {
            error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Job not found")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete job");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RunResponse {
    pub id: String,
    pub status: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// List a job's most recent runs (latest 50).
#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/runs",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Run list", body = Vec<RunResponse>),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn list_job_runs(
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

    match state.store.list_runs(&id, 50).await {
        Ok(runs) => {
            let items: Vec<RunResponse> = runs
                .into_iter()
                .map(|run| RunResponse {
                    id: run.id,
                    status: run.status,
                    duration_ms: run.duration_ms,
                    created_at: run.created_at,
                })
                .collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list runs");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AlertResponse {
    pub id: String,
    /// Absent for missed-run alerts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// List a job's most recent alerts (latest 50).
#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/alerts",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Alert list", body = Vec<AlertResponse>),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn list_job_alerts(
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

    match state.store.list_alerts(&id, 50).await {
        Ok(alerts) => {
            let items: Vec<AlertResponse> = alerts
                .into_iter()
                .map(|alert| AlertResponse {
                    id: alert.id,
                    run_id: alert.run_id,
                    message: alert.message,
                    sent_at: alert.sent_at,
                })
                .collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list alerts");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}
