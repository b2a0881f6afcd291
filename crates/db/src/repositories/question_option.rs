//! Question option repository.

use std::sync::Arc;

use crate::entities::{question_option, QuestionOption};
use pollboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Question option repository for database operations.
#[derive(Clone)]
pub struct QuestionOptionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionOptionRepository {
    /// Create a new question option repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an option by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question_option::Model>> {
        QuestionOption::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an option by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question_option::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Option not found: {id}")))
    }

    /// List options for a question in display order.
    pub async fn find_by_question(
        &self,
        question_id: &str,
    ) -> AppResult<Vec<question_option::Model>> {
        QuestionOption::find()
            .filter(question_option::Column::QuestionId.eq(question_id))
            .order_by_asc(question_option::Column::OptionOrder)
            .order_by_asc(question_option::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List options for several questions at once (one round trip per form).
    pub async fn find_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<Vec<question_option::Model>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        QuestionOption::find()
            .filter(question_option::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .order_by_asc(question_option::Column::OptionOrder)
            .order_by_asc(question_option::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count options in a question (used to assign append-only order).
    pub async fn count_by_question(&self, question_id: &str) -> AppResult<u64> {
        QuestionOption::find()
            .filter(question_option::Column::QuestionId.eq(question_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new option.
    pub async fn create(
        &self,
        model: question_option::ActiveModel,
    ) -> AppResult<question_option::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an option.
    pub async fn update(
        &self,
        model: question_option::ActiveModel,
    ) -> AppResult<question_option::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an option. Cascades to responses referencing it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        QuestionOption::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
