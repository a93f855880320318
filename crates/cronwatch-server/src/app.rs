use crate::state::AppState;
use crate::{api, logging, middleware as mw};
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cronwatch API",
        description = "Dead-man's-switch heartbeat monitoring REST API",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Ping", description = "Public heartbeat ingress"),
        (name = "Jobs", description = "Monitored job management"),
        (name = "Rules", description = "Threshold rule management"),
        (name = "Stats", description = "Read-only statistics")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_spec) = api::public_routes().split_for_parts();
    let (owner_router, owner_spec) = api::owner_routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(public_spec);
    merged_spec.merge(owner_spec);
    let spec = Arc::new(merged_spec);

    let cors = build_cors(&state.config.cors_allowed_origins);

    public_router
        .merge(owner_router.layer(middleware::from_fn(mw::owner_identity)))
        .with_state(state)
        .merge(openapi_route(spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        // Development mode: everything goes.
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn openapi_route(spec: Arc<utoipa::openapi::OpenApi>) -> Router {
    Router::new().route(
        "/v1/openapi.json",
        get(move || {
            let spec = spec.clone();
            async move { Json((*spec).clone()) }
        }),
    )
}
