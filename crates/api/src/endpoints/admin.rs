//! Admin endpoints.

use axum::{extract::State, routing::post, Json, Router};
use pollboard_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteUserRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct DeleteUserResponse {
    success: bool,
}

/// Irreversibly delete a user and everything that cascades from them.
/// Admin only; self-deletion is rejected.
async fn delete_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteUserRequest>,
) -> AppResult<ApiResponse<DeleteUserResponse>> {
    state.account_service.delete_user(&user, &req.user_id).await?;
    Ok(ApiResponse::ok(DeleteUserResponse { success: true }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/delete-user", post(delete_user))
}
