//! Ballot endpoints, nested under `/forms`.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pollboard_common::AppResult;
use pollboard_core::BallotSelection;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBallotRequest {
    selections: Vec<SelectionRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionRequest {
    question_id: String,
    option_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BallotResponse {
    has_voted: bool,
    /// Question ID to chosen option ID.
    selections: HashMap<String, String>,
}

/// Submit a complete ballot.
async fn submit_ballot(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<SubmitBallotRequest>,
) -> AppResult<ApiResponse<BallotResponse>> {
    let selections: Vec<BallotSelection> = req
        .selections
        .into_iter()
        .map(|s| BallotSelection {
            question_id: s.question_id,
            option_id: s.option_id,
        })
        .collect();

    state
        .vote_service
        .submit_ballot(&form_id, &user, &selections)
        .await?;

    let ballot = state.vote_service.my_ballot(&form_id, &user).await?;
    Ok(ApiResponse::ok(BallotResponse {
        has_voted: true,
        selections: ballot,
    }))
}

/// The caller's own ballot, used to pre-highlight a voted form on re-entry.
async fn show_ballot(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<ApiResponse<BallotResponse>> {
    let ballot = state.vote_service.my_ballot(&form_id, &user).await?;
    Ok(ApiResponse::ok(BallotResponse {
        has_voted: !ballot.is_empty(),
        selections: ballot,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{form_id}/vote", post(submit_ballot))
        .route("/{form_id}/ballot", get(show_ballot))
}
