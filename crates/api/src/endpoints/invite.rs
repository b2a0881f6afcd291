//! Invite and editor-grant endpoints, nested under `/forms`.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pollboard_common::AppResult;
use pollboard_core::Redemption;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

#[derive(Debug, Deserialize)]
struct RedeemRequest {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RedeemResponse {
    status: &'static str,
}

/// Redeem an invite token. Idempotent: an existing grant is a success.
async fn redeem(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<RedeemRequest>,
) -> AppResult<ApiResponse<RedeemResponse>> {
    let outcome = state
        .invite_service
        .redeem(&form_id, &req.token, &user)
        .await?;
    let status = match outcome {
        Redemption::AlreadyOwner => "alreadyOwner",
        Redemption::AlreadyEditor => "alreadyEditor",
        Redemption::Granted => "granted",
    };
    Ok(ApiResponse::ok(RedeemResponse { status }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InviteResponse {
    invite_token: Option<String>,
    invite_enabled: bool,
}

/// Rotate the invite token, invalidating the previous link. Owner only.
async fn rotate(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<ApiResponse<InviteResponse>> {
    let form = state.form_service.get_for_owner(&form_id, &user).await?;

    let updated = state.invite_service.rotate_token(&form).await?;
    Ok(ApiResponse::ok(InviteResponse {
        invite_token: updated.invite_token,
        invite_enabled: updated.invite_enabled,
    }))
}

#[derive(Debug, Deserialize)]
struct EnabledRequest {
    enabled: bool,
}

/// Enable or disable redemption without changing the token. Owner only.
async fn set_enabled(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<EnabledRequest>,
) -> AppResult<ApiResponse<InviteResponse>> {
    let form = state.form_service.get_for_owner(&form_id, &user).await?;

    let updated = state.invite_service.set_enabled(&form, req.enabled).await?;
    Ok(ApiResponse::ok(InviteResponse {
        invite_token: updated.invite_token,
        invite_enabled: updated.invite_enabled,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditorResponse {
    user_id: String,
    granted_at: String,
}

/// List editor grants on a form. Editor capability required.
async fn list_editors(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<ApiResponse<Vec<EditorResponse>>> {
    let form = state.form_service.get_for_edit(&form_id, &user).await?;

    let grants = state.invite_service.list_grants(&form.id).await?;
    Ok(ApiResponse::ok(
        grants
            .into_iter()
            .map(|g| EditorResponse {
                user_id: g.user_id,
                granted_at: g.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct GrantRequest {
    username: String,
}

/// Grant editor capability directly by username. Owner only.
async fn grant_editor(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<GrantRequest>,
) -> AppResult<ApiResponse<EditorResponse>> {
    let form = state.form_service.get_for_owner(&form_id, &user).await?;

    let grant = state
        .invite_service
        .grant_by_username(&form, &req.username)
        .await?;
    Ok(ApiResponse::ok(EditorResponse {
        user_id: grant.user_id,
        granted_at: grant.created_at.to_rfc3339(),
    }))
}

/// Revoke an editor grant. Owner only.
async fn revoke_editor(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((form_id, target_user_id)): Path<(String, String)>,
) -> AppResult<impl axum::response::IntoResponse> {
    let form = state.form_service.get_for_owner(&form_id, &user).await?;

    state.invite_service.revoke(&form, &target_user_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{form_id}/invite/redeem", post(redeem))
        .route("/{form_id}/invite/rotate", post(rotate))
        .route("/{form_id}/invite/enabled", post(set_enabled))
        .route("/{form_id}/editors", get(list_editors).post(grant_editor))
        .route(
            "/{form_id}/editors/{user_id}",
            axum::routing::delete(revoke_editor),
        )
}
