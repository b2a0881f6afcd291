//! Results endpoints, nested under `/forms`.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use pollboard_common::AppResult;
use pollboard_core::FormResults;

use crate::{extractors::MaybeAuthUser, middleware::AppState, response::ApiResponse};

/// Tallied results, recomputed on every request so live votes show up.
async fn show_results(
    MaybeAuthUser(maybe_user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<ApiResponse<FormResults>> {
    let results = state
        .tally_service
        .compute(&form_id, maybe_user.as_ref())
        .await?;
    Ok(ApiResponse::ok(results))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{form_id}/results", get(show_results))
}
