use crate::api::error_response;
use crate::logging::TraceId;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// The already-authenticated owner identity of a request.
///
/// Identity and session management are external collaborators: an
/// upstream authenticating proxy validates the caller and installs the
/// resulting identity in the `x-owner-id` header. This middleware only
/// requires the header's presence on owner-scoped routes.
#[derive(Clone)]
pub struct OwnerId(pub String);

impl std::ops::Deref for OwnerId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

pub async fn owner_identity(mut req: Request, next: Next) -> Response {
    let owner = req
        .headers()
        .get("x-owner-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let Some(owner) = owner else {
        let trace_id = req
            .extensions()
            .get::<TraceId>()
            .cloned()
            .unwrap_or_else(|| TraceId(String::new()));
        return error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "unauthorized",
            "Missing x-owner-id header",
        );
    };

    req.extensions_mut().insert(OwnerId(owner));
    next.run(req).await
}
