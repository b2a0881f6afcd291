//! Question repository.

use std::sync::Arc;

use crate::entities::{question, Question};
use pollboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a question by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {id}")))
    }

    /// List questions for a form in display order, id as the stable tiebreak.
    pub async fn find_by_form(&self, form_id: &str) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(question::Column::FormId.eq(form_id))
            .order_by_asc(question::Column::QuestionOrder)
            .order_by_asc(question::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count questions in a form (used to assign append-only order).
    pub async fn count_by_form(&self, form_id: &str) -> AppResult<u64> {
        Question::find()
            .filter(question::Column::FormId.eq(form_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a question.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a question. Cascades to options and responses.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Question::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_question(id: &str, form_id: &str, order: i32) -> question::Model {
        question::Model {
            id: id.to_string(),
            form_id: form_id.to_string(),
            title: format!("Question {order}"),
            question_order: order,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_form_preserves_order() {
        let q1 = create_test_question("q1", "f1", 0);
        let q2 = create_test_question("q2", "f1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[q1.clone(), q2.clone()]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let questions = repo.find_by_form("f1").await.unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question_order, 0);
        assert_eq!(questions[1].question_order, 1);
    }
}
