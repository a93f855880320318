use crate::alerting;
use crate::api::{error_response, success_empty_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use cronwatch_alert::evaluate;
use cronwatch_common::types::{Job, JobRun, PingReport};

/// Result of one run-report attempt.
enum RecordOutcome {
    Recorded(JobRun),
    /// A run for this job already exists inside the duplicate window. Not
    /// an error: the sender retried a request that already succeeded.
    Suppressed,
}

/// Heartbeat ingress. The path segment is the job's ping key; the body is
/// an optional JSON run report. An absent body is an implicit success
/// heartbeat.
#[utoipa::path(
    post,
    path = "/ping/{ping_key}",
    tag = "Ping",
    params(
        ("ping_key" = String, Path, description = "Job ping key (capability token)")
    ),
    request_body(content = Vec<u8>, description = "Optional JSON run report; absent body is an implicit success heartbeat"),
    responses(
        (status = 200, description = "Run recorded or duplicate suppressed"),
        (status = 400, description = "Malformed ping body", body = crate::api::ApiError),
        (status = 404, description = "Unknown ping key", body = crate::api::ApiError)
    )
)]
pub async fn ping(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(ping_key): Path<String>,
    body: Bytes,
) -> Response {
    let job = match state.store.get_job_by_ping_key(&ping_key).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Job not found")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve ping key");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let report = if body.is_empty() {
        PingReport::default()
    } else {
        match serde_json::from_slice::<PingReport>(&body) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(job = %job.name, error = %e, "Malformed ping body");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    "Invalid JSON",
                );
            }
        }
    };

    match record_run(&state, &job, &report).await {
        Ok(RecordOutcome::Suppressed) => {
            tracing::info!(job = %job.name, "Duplicate ping suppressed");
            success_empty_response(StatusCode::OK, &trace_id, "duplicate suppressed")
        }
        Ok(RecordOutcome::Recorded(run)) => {
            spawn_rule_pass(state.clone(), job, run);
            success_empty_response(StatusCode::OK, &trace_id, "run recorded")
        }
        Err(e) => {
            tracing::error!(job = %job.name, error = %e, "Failed to save run");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to save run",
            )
        }
    }
}

/// Idempotency guard + run recorder.
///
/// The duplicate check and the insert are two separate store operations:
/// concurrent pings inside the window can both pass the check, so this is
/// best-effort dedup, not a uniqueness guarantee. A failing check fails
/// open and the run is recorded anyway.
async fn record_run(
    state: &AppState,
    job: &Job,
    report: &PingReport,
) -> anyhow::Result<RecordOutcome> {
    let window = state.config.ping.duplicate_window_secs;
    match state.store.recent_run_exists(&job.id, window).await {
        Ok(true) => return Ok(RecordOutcome::Suppressed),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(job = %job.name, error = %e, "Duplicate check failed; recording anyway");
        }
    }

    let run = state.store.insert_run(&job.id, report).await?;
    Ok(RecordOutcome::Recorded(run))
}

/// Detached post-run rule pass. Runs concurrently with (and after) the
/// ping response; a failure here is logged and the pass ends, with no
/// retry within the pass.
fn spawn_rule_pass(state: AppState, job: Job, run: JobRun) {
    tokio::spawn(async move {
        let rules = match state.store.rules_for_job(&job.id).await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!(job = %job.name, error = %e, "Failed to fetch rules");
                return;
            }
        };

        for rule in rules {
            let result = evaluate(&run.metrics, &rule);
            if result.violated {
                alerting::dispatch_rule_alert(
                    &state.store,
                    &state.notifier,
                    &job,
                    &run,
                    &rule,
                    result.value,
                )
                .await;
            }
        }
    });
}
