//! Editor grant repository.

use std::sync::Arc;

use crate::entities::{editor_grant, EditorGrant};
use pollboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    SqlErr,
};

/// Editor grant repository for database operations.
#[derive(Clone)]
pub struct EditorGrantRepository {
    db: Arc<DatabaseConnection>,
}

impl EditorGrantRepository {
    /// Create a new editor grant repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a grant for a (form, user) pair.
    pub async fn find_by_form_and_user(
        &self,
        form_id: &str,
        user_id: &str,
    ) -> AppResult<Option<editor_grant::Model>> {
        EditorGrant::find()
            .filter(editor_grant::Column::FormId.eq(form_id))
            .filter(editor_grant::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all grants on a form, oldest first.
    pub async fn find_by_form(&self, form_id: &str) -> AppResult<Vec<editor_grant::Model>> {
        EditorGrant::find()
            .filter(editor_grant::Column::FormId.eq(form_id))
            .order_by_asc(editor_grant::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a grant.
    ///
    /// A unique-index violation maps to `Conflict` so callers can decide
    /// whether the duplicate is benign (invite redemption) or an error
    /// (explicit double-grant).
    pub async fn create(&self, model: editor_grant::ActiveModel) -> AppResult<editor_grant::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Grant already exists".to_string())
                }
                _ => AppError::Database(e.to_string()),
            }
        })
    }

    /// Remove a grant (revocation).
    pub async fn delete_by_form_and_user(&self, form_id: &str, user_id: &str) -> AppResult<u64> {
        let result = EditorGrant::delete_many()
            .filter(editor_grant::Column::FormId.eq(form_id))
            .filter(editor_grant::Column::UserId.eq(user_id))
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

    fn create_test_grant(id: &str, form_id: &str, user_id: &str) -> editor_grant::Model {
        editor_grant::Model {
            id: id.to_string(),
            form_id: form_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_form_and_user_found() {
        let grant = create_test_grant("g1", "f1", "u2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[grant.clone()]])
                .into_connection(),
        );

        let repo = EditorGrantRepository::new(db);
        let found = repo.find_by_form_and_user("f1", "u2").await.unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().id, "g1");
    }

    #[tokio::test]
    async fn test_find_by_form_and_user_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<editor_grant::Model>::new()])
                .into_connection(),
        );

        let repo = EditorGrantRepository::new(db);
        let found = repo.find_by_form_and_user("f1", "u3").await.unwrap();

        assert!(found.is_none());
    }
}
