//! Form repository.

use std::sync::Arc;

use crate::entities::{editor_grant, form, question, question_option, EditorGrant, Form};
use pollboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

/// Form repository for database operations.
#[derive(Clone)]
pub struct FormRepository {
    db: Arc<DatabaseConnection>,
}

impl FormRepository {
    /// Create a new form repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a form by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<form::Model>> {
        Form::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a form by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<form::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::FormNotFound(id.to_string()))
    }

    /// List forms created by a user, newest first.
    pub async fn find_by_creator(&self, creator_id: &str) -> AppResult<Vec<form::Model>> {
        Form::find()
            .filter(form::Column::CreatorId.eq(creator_id))
            .order_by_desc(form::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List forms a user can edit via a grant, newest first.
    pub async fn find_granted_to(&self, user_id: &str) -> AppResult<Vec<form::Model>> {
        Form::find()
            .inner_join(EditorGrant)
            .filter(editor_grant::Column::UserId.eq(user_id))
            .order_by_desc(form::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new form.
    pub async fn create(&self, model: form::ActiveModel) -> AppResult<form::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a form.
    pub async fn update(&self, model: form::ActiveModel) -> AppResult<form::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a batch of structure changes (questions and options) in one
    /// transaction, so a partially-applied autosave is never observable.
    pub async fn save_structure(
        &self,
        question_inserts: Vec<question::ActiveModel>,
        question_updates: Vec<question::ActiveModel>,
        option_inserts: Vec<question_option::ActiveModel>,
        option_updates: Vec<question_option::ActiveModel>,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let apply = async {
            for model in question_inserts {
                model.insert(&txn).await?;
            }
            for model in question_updates {
                model.update(&txn).await?;
            }
            for model in option_inserts {
                model.insert(&txn).await?;
            }
            for model in option_updates {
                model.update(&txn).await?;
            }
            Ok::<(), sea_orm::DbErr>(())
        };

        if let Err(e) = apply.await {
            txn.rollback()
                .await
                .map_err(|re| AppError::Database(re.to_string()))?;
            return Err(AppError::Database(e.to_string()));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a form. Cascades to questions, options, responses, and grants.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Form::delete_by_id(id)
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

    fn create_test_form(id: &str, creator_id: &str) -> form::Model {
        form::Model {
            id: id.to_string(),
            title: "Class awards".to_string(),
            description: None,
            is_published: false,
            results_revealed: false,
            results_revealed_at: None,
            creator_id: creator_id.to_string(),
            invite_token: Some("aabbccdd".to_string()),
            invite_enabled: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let form = create_test_form("f1", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[form.clone()]])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let found = repo.find_by_id("f1").await.unwrap().unwrap();

        assert_eq!(found.id, "f1");
        assert_eq!(found.creator_id, "u1");
        assert!(found.invite_enabled);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<form::Model>::new()])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::FormNotFound(_))));
    }
}
