//! Pin resolution endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use pollboard_common::AppResult;
use serde::Deserialize;

use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    url: String,
}

/// Resolve a Pinterest short link to a pin ID.
///
/// A clean resolution failure is 422 with a structured body; only malformed
/// input (400) and transport faults (500) are plain errors.
async fn resolve_pin(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Response> {
    let outcome = state.resolver.resolve(&req.url).await?;
    let status = if outcome.pin_id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/resolve-pin", post(resolve_pin))
}
