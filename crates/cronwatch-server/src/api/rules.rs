use crate::api::{error_response, success_empty_response, success_response};
use crate::logging::TraceId;
use crate::middleware::OwnerId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use cronwatch_alert::CompareOp;
use cronwatch_common::types::{Rule, Severity};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateRuleRequest {
    /// Metric name to inspect in reported run metrics
    pub metric_name: String,
    /// One of `==`, `!=`, `<`, `>`
    pub operator: String,
    pub threshold_value: f64,
    /// `warning` or `critical`
    pub severity: String,
}

#[derive(Serialize, ToSchema)]
pub struct RuleResponse {
    pub id: String,
    pub job_id: String,
    pub metric_name: String,
    pub operator: String,
    pub threshold_value: f64,
    pub severity: String,
    pub created_at: DateTime<Utc>,
}

impl From<Rule> for RuleResponse {
    fn from(rule: Rule) -> Self {
        Self {
            id: rule.id,
            job_id: rule.job_id,
            metric_name: rule.metric_name,
            operator: rule.operator,
            threshold_value: rule.threshold_value,
            severity: rule.severity.to_string(),
            created_at: rule.created_at,
        }
    }
}

/// Create a threshold rule on a job. Applies only to runs reported after
/// the rule exists; no retroactive evaluation.
#[utoipa::path(
    post,
    path = "/v1/jobs/{id}/rules",
    tag = "Rules",
    params(("id" = String, Path, description = "Job ID")),
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = RuleResponse),
        (status = 400, description = "Invalid operator or severity", body = crate::api::ApiError),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn create_rule(
    Extension(trace_id): Extension<TraceId>,
    Extension(owner): Extension<OwnerId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateRuleRequest>,
) -> Response {
    if req.metric_name.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "metric_name is required",
        );
    }
    if CompareOp::from_str(&req.operator).is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "Invalid operator. Must be ==, !=, <, >",
        );
    }
    let severity = match Severity::from_str(&req.severity) {
        Ok(severity) => severity,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "Invalid severity. Must be warning or critical",
            )
        }
    };

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

    match state
        .store
        .insert_rule(&id, &req.metric_name, &req.operator, req.threshold_value, severity)
        .await
    {
        Ok(rule) => success_response(StatusCode::CREATED, &trace_id, RuleResponse::from(rule)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// List a job's rules.
#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/rules",
    tag = "Rules",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Rule list", body = Vec<RuleResponse>),
        (status = 404, description = "Job not found", body = crate::api::ApiError)
    )
)]
pub async fn list_rules(
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

    match state.store.rules_for_job(&id).await {
        Ok(rules) => {
            let items: Vec<RuleResponse> = rules.into_iter().map(RuleResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list rules");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Delete a rule by ID.
#[utoipa::path(
    delete,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = crate::api::ApiError)
    )
)]
pub async fn delete_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.delete_rule(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Rule deleted"),
        Ok(false) => {
            error_response(StatusCode::NOT_FOUND, &trace_id, "not_found", "Rule not found")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}
