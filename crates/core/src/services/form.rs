//! Form lifecycle and structure editing.

use chrono::Utc;
use pollboard_common::{AppError, AppResult, IdGenerator};
use pollboard_db::{
    entities::{form, question, question_option, user},
    repositories::{FormRepository, QuestionOptionRepository, QuestionRepository},
};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::Deserialize;
use validator::Validate;

use crate::services::{
    access::{AccessService, Capability},
    event_publisher::EventPublisherService,
};

/// Input for creating a form.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFormInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
}

/// Input for updating form metadata. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFormInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    /// Outer `None` leaves the description unchanged; inner `None` clears it.
    pub description: Option<Option<String>>,
    pub is_published: Option<bool>,
    pub results_revealed: Option<bool>,
}

/// A question with its options, in display order.
#[derive(Debug, Clone)]
pub struct QuestionDetail {
    pub question: question::Model,
    pub options: Vec<question_option::Model>,
}

/// A form with its full structure and the caller's capability.
#[derive(Debug, Clone)]
pub struct FormDetail {
    pub form: form::Model,
    pub questions: Vec<QuestionDetail>,
    pub capability: Capability,
}

/// One question in a structure save batch. `id` absent means insert.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSave {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub options: Vec<OptionSave>,
}

/// One option in a structure save batch. `id` absent means insert.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionSave {
    pub id: Option<String>,
    pub text: String,
}

/// Service for form CRUD and structure editing.
#[derive(Clone)]
pub struct FormService {
    form_repo: FormRepository,
    question_repo: QuestionRepository,
    option_repo: QuestionOptionRepository,
    access: AccessService,
    publisher: EventPublisherService,
    id_gen: IdGenerator,
}

impl FormService {
    /// Create a new form service.
    #[must_use]
    pub fn new(
        form_repo: FormRepository,
        question_repo: QuestionRepository,
        option_repo: QuestionOptionRepository,
        access: AccessService,
        publisher: EventPublisherService,
    ) -> Self {
        Self {
            form_repo,
            question_repo,
            option_repo,
            access,
            publisher,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a form. The creator becomes its owner and a fresh invite token
    /// is issued immediately.
    pub async fn create(
        &self,
        creator: &user::Model,
        input: CreateFormInput,
    ) -> AppResult<form::Model> {
        input.validate()?;

        let model = form::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            description: Set(input.description),
            is_published: Set(false),
            results_revealed: Set(false),
            results_revealed_at: Set(None),
            creator_id: Set(creator.id.clone()),
            invite_token: Set(Some(self.id_gen.generate_token())),
            invite_enabled: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.form_repo.create(model).await?;
        tracing::info!(form_id = %created.id, creator_id = %creator.id, "form created");
        Ok(created)
    }

    /// Load a form with its questions and options.
    ///
    /// Unpublished forms are hidden from non-editors; the miss is reported
    /// as not-found so their existence does not leak.
    pub async fn get_detail(
        &self,
        form_id: &str,
        user: Option<&user::Model>,
    ) -> AppResult<FormDetail> {
        let form = self.form_repo.get_by_id(form_id).await?;
        if !self.access.can_read(&form, user).await? {
            return Err(AppError::FormNotFound(form.id));
        }
        let capability = self.access.capability(&form, user).await?;

        let questions = self.question_repo.find_by_form(&form.id).await?;
        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let mut options = self.option_repo.find_by_questions(&question_ids).await?;

        let questions = questions
            .into_iter()
            .map(|q| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    options.drain(..).partition(|o| o.question_id == q.id);
                options = rest;
                QuestionDetail {
                    question: q,
                    options: mine,
                }
            })
            .collect();

        Ok(FormDetail {
            form,
            questions,
            capability,
        })
    }

    /// Load the bare form row, requiring editor capability.
    pub async fn get_for_edit(
        &self,
        form_id: &str,
        user: &user::Model,
    ) -> AppResult<form::Model> {
        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_edit(&form, user).await?;
        Ok(form)
    }

    /// Load the bare form row, requiring owner capability.
    pub async fn get_for_owner(
        &self,
        form_id: &str,
        user: &user::Model,
    ) -> AppResult<form::Model> {
        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_owner(&form, user).await?;
        Ok(form)
    }

    /// List forms the user can edit: their own plus those granted to them.
    pub async fn list_editable(&self, user: &user::Model) -> AppResult<Vec<form::Model>> {
        let mut forms = self.form_repo.find_by_creator(&user.id).await?;
        forms.extend(self.form_repo.find_granted_to(&user.id).await?);
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(forms)
    }

    /// Update form metadata, including the publish and reveal toggles.
    /// Editor capability suffices for all of it; only deletion and
    /// grant/invite management are reserved for the owner.
    pub async fn update(
        &self,
        form_id: &str,
        user: &user::Model,
        input: UpdateFormInput,
    ) -> AppResult<form::Model> {
        input.validate()?;

        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_edit(&form, user).await?;

        let reveal_changed = input
            .results_revealed
            .is_some_and(|r| r != form.results_revealed);

        let model = Self::metadata_update(&form, input, Utc::now());
        let updated = self.form_repo.update(model).await?;

        self.publisher.publish_form_updated(&form.id).await?;
        if reveal_changed {
            self.publisher
                .publish_results_revealed(&form.id, updated.results_revealed)
                .await?;
        }

        Ok(updated)
    }

    /// Build the column set for a metadata update. Only present fields are
    /// written; flipping the reveal flag stamps or clears
    /// `results_revealed_at` so the flag and timestamp always agree.
    fn metadata_update(
        form: &form::Model,
        input: UpdateFormInput,
        now: chrono::DateTime<Utc>,
    ) -> form::ActiveModel {
        let mut model = form::ActiveModel {
            id: Set(form.id.clone()),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        if let Some(title) = input.title {
            model.title = Set(title);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(published) = input.is_published {
            model.is_published = Set(published);
        }
        if let Some(revealed) = input.results_revealed {
            model.results_revealed = Set(revealed);
            model.results_revealed_at = if revealed {
                Set(Some(now.into()))
            } else {
                Set(None)
            };
        }
        model
    }

    /// Delete a form and everything under it. Owner only.
    pub async fn delete(&self, form_id: &str, user: &user::Model) -> AppResult<()> {
        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_owner(&form, user).await?;
        self.form_repo.delete(&form.id).await?;
        tracing::info!(form_id = %form.id, user_id = %user.id, "form deleted");
        Ok(())
    }

    /// Append a question to a form.
    pub async fn add_question(
        &self,
        form_id: &str,
        user: &user::Model,
        title: String,
    ) -> AppResult<question::Model> {
        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_edit(&form, user).await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let order = self.question_repo.count_by_form(&form.id).await? as i32;
        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            form_id: Set(form.id.clone()),
            title: Set(title),
            question_order: Set(order),
            created_at: Set(Utc::now().into()),
        };
        let created = self.question_repo.create(model).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(created)
    }

    /// Rename a question.
    pub async fn update_question(
        &self,
        question_id: &str,
        user: &user::Model,
        title: String,
    ) -> AppResult<question::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;
        let form = self.form_repo.get_by_id(&question.form_id).await?;
        self.access.require_edit(&form, user).await?;

        let model = question::ActiveModel {
            id: Set(question.id.clone()),
            title: Set(title),
            ..Default::default()
        };
        let updated = self.question_repo.update(model).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(updated)
    }

    /// Delete a question, its options, and any responses to it.
    pub async fn delete_question(&self, question_id: &str, user: &user::Model) -> AppResult<()> {
        let question = self.question_repo.get_by_id(question_id).await?;
        let form = self.form_repo.get_by_id(&question.form_id).await?;
        self.access.require_edit(&form, user).await?;

        self.question_repo.delete(&question.id).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(())
    }

    /// Append an option to a question.
    pub async fn add_option(
        &self,
        question_id: &str,
        user: &user::Model,
        text: String,
    ) -> AppResult<question_option::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;
        let form = self.form_repo.get_by_id(&question.form_id).await?;
        self.access.require_edit(&form, user).await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let order = self.option_repo.count_by_question(&question.id).await? as i32;
        let model = question_option::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question.id.clone()),
            text: Set(text),
            option_order: Set(order),
            created_at: Set(Utc::now().into()),
        };
        let created = self.option_repo.create(model).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(created)
    }

    /// Update an option's text.
    pub async fn update_option(
        &self,
        option_id: &str,
        user: &user::Model,
        text: String,
    ) -> AppResult<question_option::Model> {
        let option = self.option_repo.get_by_id(option_id).await?;
        let question = self.question_repo.get_by_id(&option.question_id).await?;
        let form = self.form_repo.get_by_id(&question.form_id).await?;
        self.access.require_edit(&form, user).await?;

        let model = question_option::ActiveModel {
            id: Set(option.id.clone()),
            text: Set(text),
            ..Default::default()
        };
        let updated = self.option_repo.update(model).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(updated)
    }

    /// Delete an option and any responses referencing it.
    pub async fn delete_option(&self, option_id: &str, user: &user::Model) -> AppResult<()> {
        let option = self.option_repo.get_by_id(option_id).await?;
        let question = self.question_repo.get_by_id(&option.question_id).await?;
        let form = self.form_repo.get_by_id(&question.form_id).await?;
        self.access.require_edit(&form, user).await?;

        self.option_repo.delete(&option.id).await?;
        self.publisher.publish_form_updated(&form.id).await?;
        Ok(())
    }

    /// Apply a batched structure save (the autosave payload) atomically.
    ///
    /// Entries with an `id` update the existing row if it belongs to this
    /// form; entries without one insert. Rows not mentioned are left alone,
    /// so a stale client never deletes a colleague's concurrent additions.
    pub async fn save_structure(
        &self,
        form_id: &str,
        user: &user::Model,
        batch: Vec<QuestionSave>,
    ) -> AppResult<()> {
        let form = self.form_repo.get_by_id(form_id).await?;
        self.access.require_edit(&form, user).await?;

        let existing_questions = self.question_repo.find_by_form(&form.id).await?;
        let question_ids: Vec<String> =
            existing_questions.iter().map(|q| q.id.clone()).collect();
        let existing_options = self.option_repo.find_by_questions(&question_ids).await?;

        let mut question_inserts = Vec::new();
        let mut question_updates = Vec::new();
        let mut option_inserts = Vec::new();
        let mut option_updates = Vec::new();

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let mut next_question_order = existing_questions.len() as i32;
        let now = Utc::now();

        for entry in batch {
            let question_id = match entry.id {
                Some(id) => {
                    if !existing_questions.iter().any(|q| q.id == id) {
                        return Err(AppError::Unprocessable(format!(
                            "Question {id} does not belong to this form"
                        )));
                    }
                    question_updates.push(question::ActiveModel {
                        id: Set(id.clone()),
                        title: Set(entry.title),
                        form_id: NotSet,
                        question_order: NotSet,
                        created_at: NotSet,
                    });
                    id
                }
                None => {
                    let id = self.id_gen.generate();
                    question_inserts.push(question::ActiveModel {
                        id: Set(id.clone()),
                        form_id: Set(form.id.clone()),
                        title: Set(entry.title),
                        question_order: Set(next_question_order),
                        created_at: Set(now.into()),
                    });
                    next_question_order += 1;
                    id
                }
            };

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let mut next_option_order = existing_options
                .iter()
                .filter(|o| o.question_id == question_id)
                .count() as i32;
            for opt in entry.options {
                match opt.id {
                    Some(id) => {
                        let belongs = existing_options
                            .iter()
                            .any(|o| o.id == id && o.question_id == question_id);
                        if !belongs {
                            return Err(AppError::Unprocessable(format!(
                                "Option {id} does not belong to question {question_id}"
                            )));
                        }
                        option_updates.push(question_option::ActiveModel {
                            id: Set(id),
                            text: Set(opt.text),
                            question_id: NotSet,
                            option_order: NotSet,
                            created_at: NotSet,
                        });
                    }
                    None => {
                        option_inserts.push(question_option::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            question_id: Set(question_id.clone()),
                            text: Set(opt.text),
                            option_order: Set(next_option_order),
                            created_at: Set(now.into()),
                        });
                        next_option_order += 1;
                    }
                }
            }
        }

        self.form_repo
            .save_structure(
                question_inserts,
                question_updates,
                option_inserts,
                option_updates,
            )
            .await?;

        let stamp = form::ActiveModel {
            id: Set(form.id.clone()),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        self.form_repo.update(stamp).await?;

        self.publisher.publish_form_updated(&form.id).await?;
        tracing::debug!(form_id = %form.id, user_id = %user.id, "structure batch saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event_publisher::NoOpEventPublisher;
    use pollboard_db::entities::editor_grant;
    use pollboard_db::repositories::EditorGrantRepository;
    use sea_orm::{ActiveValue, DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            display_name: None,
            token: None,
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    fn test_form(id: &str, creator_id: &str) -> form::Model {
        form::Model {
            id: id.to_string(),
            title: "Quiz night".to_string(),
            description: None,
            is_published: true,
            results_revealed: false,
            results_revealed_at: None,
            creator_id: creator_id.to_string(),
            invite_token: Some("tok".to_string()),
            invite_enabled: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn reveal_flip_stamps_timestamp() {
        let form = test_form("f1", "u1");
        let input = UpdateFormInput {
            results_revealed: Some(true),
            ..Default::default()
        };

        let model = FormService::metadata_update(&form, input, Utc::now());

        assert!(matches!(model.results_revealed, ActiveValue::Set(true)));
        assert!(matches!(
            model.results_revealed_at,
            ActiveValue::Set(Some(_))
        ));
    }

    #[test]
    fn hiding_results_clears_timestamp() {
        let mut form = test_form("f1", "u1");
        form.results_revealed = true;
        form.results_revealed_at = Some(Utc::now().into());
        let input = UpdateFormInput {
            results_revealed: Some(false),
            ..Default::default()
        };

        let model = FormService::metadata_update(&form, input, Utc::now());

        assert!(matches!(model.results_revealed, ActiveValue::Set(false)));
        assert!(matches!(model.results_revealed_at, ActiveValue::Set(None)));
    }

    #[test]
    fn absent_fields_are_left_untouched() {
        let form = test_form("f1", "u1");
        let input = UpdateFormInput::default();

        let model = FormService::metadata_update(&form, input, Utc::now());

        assert!(matches!(model.title, ActiveValue::NotSet));
        assert!(matches!(model.description, ActiveValue::NotSet));
        assert!(matches!(model.is_published, ActiveValue::NotSet));
        assert!(matches!(model.results_revealed, ActiveValue::NotSet));
        assert!(matches!(model.updated_at, ActiveValue::Set(Some(_))));
    }

    #[tokio::test]
    async fn editors_can_toggle_publish_and_reveal() {
        let editor = test_user("editor");
        let grant = editor_grant::Model {
            id: "g1".to_string(),
            form_id: "f1".to_string(),
            user_id: "editor".to_string(),
            created_at: Utc::now().into(),
        };
        let mut unpublished = test_form("f1", "owner");
        unpublished.is_published = false;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[unpublished]])
                .append_query_results([[grant]])
                .append_query_results([[test_form("f1", "owner")]])
                .into_connection(),
        );

        let service = FormService::new(
            FormRepository::new(Arc::clone(&db)),
            QuestionRepository::new(Arc::clone(&db)),
            QuestionOptionRepository::new(Arc::clone(&db)),
            AccessService::new(EditorGrantRepository::new(Arc::clone(&db))),
            Arc::new(NoOpEventPublisher),
        );

        let input = UpdateFormInput {
            is_published: Some(true),
            ..Default::default()
        };
        let updated = service.update("f1", &editor, input).await.unwrap();

        assert!(updated.is_published);
    }
}
