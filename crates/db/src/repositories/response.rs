//! Response repository.

use std::sync::Arc;

use crate::entities::{response, Response};
use pollboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    SqlErr, TransactionTrait,
};

/// Response repository for database operations.
#[derive(Clone)]
pub struct ResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl ResponseRepository {
    /// Create a new response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List all responses across a set of questions (tally input).
    pub async fn find_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<Vec<response::Model>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        Response::find()
            .filter(response::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List one voter's responses across a set of questions.
    pub async fn find_by_voter_and_questions(
        &self,
        voter_id: &str,
        question_ids: &[String],
    ) -> AppResult<Vec<response::Model>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        Response::find()
            .filter(response::Column::VoterId.eq(voter_id))
            .filter(response::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a voter has any response across a set of questions.
    pub async fn has_voted(&self, voter_id: &str, question_ids: &[String]) -> AppResult<bool> {
        if question_ids.is_empty() {
            return Ok(false);
        }
        let count = Response::find()
            .filter(response::Column::VoterId.eq(voter_id))
            .filter(response::Column::QuestionId.is_in(question_ids.iter().cloned()))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Insert a full ballot as one transaction.
    ///
    /// Either every row lands or none do; a voter is never left with a
    /// partial ballot. A unique-index violation (racing double submission)
    /// rolls the whole batch back and surfaces as `Conflict`.
    pub async fn create_ballot(&self, models: Vec<response::ActiveModel>) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for model in models {
            if let Err(e) = model.insert(&txn).await {
                let mapped = match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        AppError::Conflict("Ballot already submitted".to_string())
                    }
                    _ => AppError::Database(e.to_string()),
                };
                txn.rollback()
                    .await
                    .map_err(|re| AppError::Database(re.to_string()))?;
                return Err(mapped);
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Bulk purge of all responses for a question (administrative only).
    pub async fn delete_by_question(&self, question_id: &str) -> AppResult<u64> {
        let result = Response::delete_many()
            .filter(response::Column::QuestionId.eq(question_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_response(
        id: &str,
        question_id: &str,
        option_id: &str,
        voter_id: &str,
    ) -> response::Model {
        response::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            option_id: option_id.to_string(),
            voter_id: voter_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_voter_and_questions() {
        let r1 = create_test_response("r1", "q1", "o1", "u1");
        let r2 = create_test_response("r2", "q2", "o3", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1.clone(), r2.clone()]])
                .into_connection(),
        );

        let repo = ResponseRepository::new(db);
        let found = repo
            .find_by_voter_and_questions("u1", &["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.voter_id == "u1"));
    }

    #[tokio::test]
    async fn test_empty_question_set_short_circuits() {
        // No DB round trip for an empty form.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let repo = ResponseRepository::new(db);
        assert!(!repo.has_voted("u1", &[]).await.unwrap());
        assert!(repo.find_by_questions(&[]).await.unwrap().is_empty());
        assert!(repo
            .find_by_voter_and_questions("u1", &[])
            .await
            .unwrap()
            .is_empty());
    }
}
