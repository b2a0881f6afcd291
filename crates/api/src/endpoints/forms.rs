//! Form endpoints: CRUD, structure editing, batched saves.

use axum::{
    extract::{Path, State},
    routing::{get, patch, post, put},
    Json, Router,
};
use pollboard_common::AppResult;
use pollboard_core::{
    Capability, CreateFormInput, FormDetail, QuestionSave, UpdateFormInput,
};
use pollboard_db::entities::form;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ok, ApiResponse},
};

/// Form representation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_published: bool,
    pub results_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_revealed_at: Option<String>,
    pub creator_id: String,
    pub invite_enabled: bool,
    /// Only disclosed to the owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl FormResponse {
    /// Build a response, disclosing the invite token only to the owner.
    #[must_use]
    pub fn from_model(form: &form::Model, capability: Capability) -> Self {
        Self {
            id: form.id.clone(),
            title: form.title.clone(),
            description: form.description.clone(),
            is_published: form.is_published,
            results_revealed: form.results_revealed,
            results_revealed_at: form.results_revealed_at.map(|t| t.to_rfc3339()),
            creator_id: form.creator_id.clone(),
            invite_enabled: form.invite_enabled,
            invite_token: if capability == Capability::Owner {
                form.invite_token.clone()
            } else {
                None
            },
            created_at: form.created_at.to_rfc3339(),
            updated_at: form.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Question with its options.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub title: String,
    pub order: i32,
    pub options: Vec<OptionResponse>,
}

/// Answer option.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub id: String,
    pub text: String,
    pub order: i32,
}

/// Full form detail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDetailResponse {
    #[serde(flatten)]
    pub form: FormResponse,
    pub questions: Vec<QuestionResponse>,
    pub capability: &'static str,
}

fn capability_name(cap: Capability) -> &'static str {
    match cap {
        Capability::None => "none",
        Capability::Voter => "voter",
        Capability::Editor => "editor",
        Capability::Owner => "owner",
    }
}

fn detail_response(detail: FormDetail) -> FormDetailResponse {
    let FormDetail {
        form,
        questions,
        capability,
    } = detail;
    FormDetailResponse {
        form: FormResponse::from_model(&form, capability),
        questions: questions
            .into_iter()
            .map(|q| QuestionResponse {
                id: q.question.id,
                title: q.question.title,
                order: q.question.question_order,
                options: q
                    .options
                    .into_iter()
                    .map(|o| OptionResponse {
                        id: o.id,
                        text: o.text,
                        order: o.option_order,
                    })
                    .collect(),
            })
            .collect(),
        capability: capability_name(capability),
    }
}

async fn create_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateFormInput>,
) -> AppResult<ApiResponse<FormResponse>> {
    let created = state.form_service.create(&user, req).await?;
    Ok(ApiResponse::ok(FormResponse::from_model(
        &created,
        Capability::Owner,
    )))
}

async fn list_forms(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<FormResponse>>> {
    let forms = state.form_service.list_editable(&user).await?;
    let mut out = Vec::with_capacity(forms.len());
    for form in &forms {
        let cap = state.access_service.capability(form, Some(&user)).await?;
        out.push(FormResponse::from_model(form, cap));
    }
    Ok(ApiResponse::ok(out))
}

async fn show_form(
    MaybeAuthUser(maybe_user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<ApiResponse<FormDetailResponse>> {
    let detail = state
        .form_service
        .get_detail(&form_id, maybe_user.as_ref())
        .await?;
    Ok(ApiResponse::ok(detail_response(detail)))
}

async fn update_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<UpdateFormInput>,
) -> AppResult<ApiResponse<FormResponse>> {
    let updated = state.form_service.update(&form_id, &user, req).await?;
    let cap = state.access_service.capability(&updated, Some(&user)).await?;
    Ok(ApiResponse::ok(FormResponse::from_model(&updated, cap)))
}

async fn delete_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.form_service.delete(&form_id, &user).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct TitleRequest {
    title: String,
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

async fn add_question(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    let question = state
        .form_service
        .add_question(&form_id, &user, req.title)
        .await?;
    Ok(ApiResponse::ok(QuestionResponse {
        id: question.id,
        title: question.title,
        order: question.question_order,
        options: Vec::new(),
    }))
}

async fn update_question(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .form_service
        .update_question(&question_id, &user, req.title)
        .await?;
    Ok(ok())
}

async fn delete_question(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.form_service.delete_question(&question_id, &user).await?;
    Ok(ok())
}

async fn add_option(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    Json(req): Json<TextRequest>,
) -> AppResult<ApiResponse<OptionResponse>> {
    let option = state
        .form_service
        .add_option(&question_id, &user, req.text)
        .await?;
    Ok(ApiResponse::ok(OptionResponse {
        id: option.id,
        text: option.text,
        order: option.option_order,
    }))
}

async fn update_option(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(option_id): Path<String>,
    Json(req): Json<TextRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .form_service
        .update_option(&option_id, &user, req.text)
        .await?;
    Ok(ok())
}

async fn delete_option(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(option_id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.form_service.delete_option(&option_id, &user).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct StructureRequest {
    questions: Vec<QuestionSave>,
}

/// Batched structure save, the target of the client-side debounced autosave.
async fn save_structure(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(req): Json<StructureRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .form_service
        .save_structure(&form_id, &user, req.questions)
        .await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form).get(list_forms))
        .route(
            "/{form_id}",
            get(show_form).patch(update_form).delete(delete_form),
        )
        .route("/{form_id}/questions", post(add_question))
        .route("/{form_id}/structure", put(save_structure))
        .route(
            "/questions/{question_id}",
            patch(update_question).delete(delete_question),
        )
        .route("/questions/{question_id}/options", post(add_option))
        .route(
            "/options/{option_id}",
            patch(update_option).delete(delete_option),
        )
}
