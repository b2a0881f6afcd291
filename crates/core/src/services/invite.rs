//! Invite links and editor grants.
//!
//! A form carries at most one active invite token. Redeeming it grants editor
//! capability. Tokens can be rotated (invalidating the old link) or disabled
//! outright, and owners can also grant or revoke editors by username.

use chrono::Utc;
use pollboard_common::{AppError, AppResult, IdGenerator};
use pollboard_db::{
    entities::{editor_grant, form, user},
    repositories::{EditorGrantRepository, FormRepository, UserRepository},
};
use sea_orm::{ActiveValue::NotSet, Set};

use crate::services::event_publisher::EventPublisherService;

/// Outcome of redeeming an invite token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// The caller owns the form; no grant is needed.
    AlreadyOwner,
    /// The caller already held an editor grant. Redemption is idempotent.
    AlreadyEditor,
    /// A fresh grant was created.
    Granted,
}

/// Service managing invite tokens and editor grants.
#[derive(Clone)]
pub struct InviteService {
    form_repo: FormRepository,
    grant_repo: EditorGrantRepository,
    user_repo: UserRepository,
    publisher: EventPublisherService,
    id_gen: IdGenerator,
}

impl InviteService {
    /// Create a new invite service.
    #[must_use]
    pub fn new(
        form_repo: FormRepository,
        grant_repo: EditorGrantRepository,
        user_repo: UserRepository,
        publisher: EventPublisherService,
    ) -> Self {
        Self {
            form_repo,
            grant_repo,
            user_repo,
            publisher,
            id_gen: IdGenerator::new(),
        }
    }

    /// Redeem an invite token against a form.
    ///
    /// Any failure mode (unknown form, token mismatch, invites disabled)
    /// surfaces as the same opaque error so the token cannot be probed.
    pub async fn redeem(
        &self,
        form_id: &str,
        token: &str,
        user: &user::Model,
    ) -> AppResult<Redemption> {
        let form = self
            .form_repo
            .find_by_id(form_id)
            .await?
            .ok_or_else(AppError::invalid_invite)?;

        if !form.invite_enabled {
            return Err(AppError::invalid_invite());
        }
        match &form.invite_token {
            Some(current) if current == token => {}
            _ => return Err(AppError::invalid_invite()),
        }

        if form.creator_id == user.id {
            return Ok(Redemption::AlreadyOwner);
        }

        if self
            .grant_repo
            .find_by_form_and_user(&form.id, &user.id)
            .await?
            .is_some()
        {
            return Ok(Redemption::AlreadyEditor);
        }

        let grant = editor_grant::ActiveModel {
            id: Set(self.id_gen.generate()),
            form_id: Set(form.id.clone()),
            user_id: Set(user.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let outcome = Self::insert_outcome(self.grant_repo.create(grant).await)?;
        if outcome != Redemption::Granted {
            return Ok(outcome);
        }

        tracing::info!(
            form_id = %form.id,
            user_id = %user.id,
            username = %user.username,
            "invite redeemed, editor grant created"
        );
        self.publisher
            .publish_editor_joined(&form.id, &user.id, &user.username)
            .await?;

        Ok(Redemption::Granted)
    }

    /// Map the grant insert result to a redemption outcome. A racing
    /// redemption by the same user may land its insert first; the unique
    /// index reports that as a conflict, which is the same idempotent
    /// success as finding the grant up front.
    fn insert_outcome(result: AppResult<editor_grant::Model>) -> AppResult<Redemption> {
        match result {
            Ok(_) => Ok(Redemption::Granted),
            Err(AppError::Conflict(_)) => Ok(Redemption::AlreadyEditor),
            Err(e) => Err(e),
        }
    }

    /// Rotate a form's invite token, invalidating any previously shared link.
    /// Owner only.
    pub async fn rotate_token(&self, form: &form::Model) -> AppResult<form::Model> {
        let token = self.id_gen.generate_token();
        let model = form::ActiveModel {
            id: Set(form.id.clone()),
            invite_token: Set(Some(token)),
            invite_enabled: Set(true),
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        let updated = self.form_repo.update(model).await?;
        tracing::info!(form_id = %form.id, "invite token rotated");
        Ok(updated)
    }

    /// Enable or disable invite redemption without changing the token.
    pub async fn set_enabled(&self, form: &form::Model, enabled: bool) -> AppResult<form::Model> {
        let model = form::ActiveModel {
            id: Set(form.id.clone()),
            invite_enabled: Set(enabled),
            invite_token: NotSet,
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        let updated = self.form_repo.update(model).await?;
        tracing::info!(form_id = %form.id, enabled, "invite redemption toggled");
        Ok(updated)
    }

    /// Grant editor capability directly by username, bypassing the token.
    ///
    /// Unlike redemption, an existing grant here is a hard conflict so the
    /// owner learns the grant was already in place.
    pub async fn grant_by_username(
        &self,
        form: &form::Model,
        username: &str,
    ) -> AppResult<editor_grant::Model> {
        let target = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;

        if target.id == form.creator_id {
            return Err(AppError::BadRequest(
                "The owner already has full access".to_string(),
            ));
        }

        let grant = editor_grant::ActiveModel {
            id: Set(self.id_gen.generate()),
            form_id: Set(form.id.clone()),
            user_id: Set(target.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let created = self.grant_repo.create(grant).await?;

        tracing::info!(
            form_id = %form.id,
            user_id = %target.id,
            username = %target.username,
            "editor granted by username"
        );
        self.publisher
            .publish_editor_joined(&form.id, &target.id, &target.username)
            .await?;

        Ok(created)
    }

    /// Revoke an editor grant.
    pub async fn revoke(&self, form: &form::Model, user_id: &str) -> AppResult<()> {
        let removed = self
            .grant_repo
            .delete_by_form_and_user(&form.id, user_id)
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound("No such editor grant".to_string()));
        }
        tracing::info!(form_id = %form.id, user_id, "editor grant revoked");
        Ok(())
    }

    /// List editor grants on a form.
    pub async fn list_grants(&self, form_id: &str) -> AppResult<Vec<editor_grant::Model>> {
        self.grant_repo.find_by_form(form_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event_publisher::NoOpEventPublisher;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
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

    fn test_form(creator_id: &str, token: Option<&str>, enabled: bool) -> form::Model {
        form::Model {
            id: "f1".to_string(),
            title: "Quiz night".to_string(),
            description: None,
            is_published: true,
            results_revealed: false,
            results_revealed_at: None,
            creator_id: creator_id.to_string(),
            invite_token: token.map(ToString::to_string),
            invite_enabled: enabled,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_grant(user_id: &str) -> editor_grant::Model {
        editor_grant::Model {
            id: "g1".to_string(),
            form_id: "f1".to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: Arc<DatabaseConnection>) -> InviteService {
        InviteService::new(
            FormRepository::new(Arc::clone(&db)),
            EditorGrantRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
            Arc::new(NoOpEventPublisher),
        )
    }

    #[tokio::test]
    async fn unknown_form_fails_opaquely() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<form::Model>::new()])
                .into_connection(),
        );

        let result = service(db).redeem("f1", "tok", &test_user("bob")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn disabled_invites_fail_opaquely() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_form("owner", Some("tok"), false)]])
                .into_connection(),
        );

        let result = service(db).redeem("f1", "tok", &test_user("bob")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn old_token_is_dead_after_rotation() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_form("owner", Some("fresh"), true)]])
                .into_connection(),
        );

        let result = service(db).redeem("f1", "stale", &test_user("bob")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn owner_redemption_needs_no_grant() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_form("alice", Some("tok"), true)]])
                .into_connection(),
        );

        let outcome = service(db)
            .redeem("f1", "tok", &test_user("alice"))
            .await
            .unwrap();

        assert_eq!(outcome, Redemption::AlreadyOwner);
    }

    #[tokio::test]
    async fn redemption_is_idempotent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_form("owner", Some("tok"), true)]])
                .append_query_results([[test_grant("bob")]])
                .into_connection(),
        );

        let outcome = service(db)
            .redeem("f1", "tok", &test_user("bob"))
            .await
            .unwrap();

        assert_eq!(outcome, Redemption::AlreadyEditor);
    }

    #[tokio::test]
    async fn first_redemption_creates_a_grant() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_form("owner", Some("tok"), true)]])
                .append_query_results([Vec::<editor_grant::Model>::new()])
                .append_query_results([[test_grant("bob")]])
                .into_connection(),
        );

        let outcome = service(db)
            .redeem("f1", "tok", &test_user("bob"))
            .await
            .unwrap();

        assert_eq!(outcome, Redemption::Granted);
    }

    #[test]
    fn racing_redemptions_both_succeed() {
        let outcome = InviteService::insert_outcome(Err(AppError::Conflict(
            "Grant already exists".to_string(),
        )))
        .unwrap();

        assert_eq!(outcome, Redemption::AlreadyEditor);
    }

    #[test]
    fn insert_faults_still_surface() {
        let result =
            InviteService::insert_outcome(Err(AppError::Database("connection reset".to_string())));

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn granting_an_unknown_username_is_reported() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let form = test_form("owner", Some("tok"), true);
        let result = service(db).grant_by_username(&form, "ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn granting_the_owner_is_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("owner")]])
                .into_connection(),
        );

        let form = test_form("owner", Some("tok"), true);
        let result = service(db).grant_by_username(&form, "owner").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
