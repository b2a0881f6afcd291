//! Capability checks for forms.
//!
//! Every authorization decision in the system reduces to a capability level
//! computed from the form row and the caller. Levels are totally ordered so
//! callers can compare with `>=`.

use pollboard_common::{AppError, AppResult};
use pollboard_db::{
    entities::{form, user},
    repositories::EditorGrantRepository,
};

/// Capability a caller holds on a given form.
///
/// Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    /// No access at all (anonymous caller).
    None,
    /// May submit a ballot on a published form.
    Voter,
    /// May edit structure and metadata.
    Editor,
    /// Full control, including invite management and deletion.
    Owner,
}

/// Service computing capabilities and enforcing access rules.
#[derive(Clone)]
pub struct AccessService {
    grant_repo: EditorGrantRepository,
}

impl AccessService {
    /// Create a new access service.
    #[must_use]
    pub const fn new(grant_repo: EditorGrantRepository) -> Self {
        Self { grant_repo }
    }

    /// Compute the capability `user` holds on `form`.
    ///
    /// Admins are treated as editors on every form so they can moderate,
    /// but ownership stays with the creator.
    pub async fn capability(
        &self,
        form: &form::Model,
        user: Option<&user::Model>,
    ) -> AppResult<Capability> {
        let Some(user) = user else {
            return Ok(Capability::None);
        };

        if user.id == form.creator_id {
            return Ok(Capability::Owner);
        }

        if user.is_admin {
            return Ok(Capability::Editor);
        }

        if self
            .grant_repo
            .find_by_form_and_user(&form.id, &user.id)
            .await?
            .is_some()
        {
            return Ok(Capability::Editor);
        }

        Ok(Capability::Voter)
    }

    /// Require editor capability or better.
    pub async fn require_edit(
        &self,
        form: &form::Model,
        user: &user::Model,
    ) -> AppResult<Capability> {
        let cap = self.capability(form, Some(user)).await?;
        if cap >= Capability::Editor {
            Ok(cap)
        } else {
            Err(AppError::Forbidden(
                "Editing this form requires an editor grant".to_string(),
            ))
        }
    }

    /// Require owner capability. Admins also pass for moderation purposes.
    pub async fn require_owner(
        &self,
        form: &form::Model,
        user: &user::Model,
    ) -> AppResult<Capability> {
        let cap = self.capability(form, Some(user)).await?;
        if cap == Capability::Owner || user.is_admin {
            Ok(cap)
        } else {
            Err(AppError::Forbidden(
                "Only the form owner may do this".to_string(),
            ))
        }
    }

    /// Whether `user` may see tallied results for `form`.
    ///
    /// Editors and owners always see results. Voters only see them once the
    /// form is published, results are revealed, and they have voted
    /// themselves.
    pub async fn can_view_results(
        &self,
        form: &form::Model,
        user: Option<&user::Model>,
        has_voted: bool,
    ) -> AppResult<bool> {
        let cap = self.capability(form, user).await?;
        if cap >= Capability::Editor {
            return Ok(true);
        }
        Ok(form.is_published && form.results_revealed && has_voted)
    }

    /// Whether `user` may read the form at all (structure, metadata).
    ///
    /// Unpublished forms are only visible to editors and owners.
    pub async fn can_read(
        &self,
        form: &form::Model,
        user: Option<&user::Model>,
    ) -> AppResult<bool> {
        if form.is_published {
            return Ok(self.capability(form, user).await? >= Capability::Voter);
        }
        Ok(self.capability(form, user).await? >= Capability::Editor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pollboard_db::entities::editor_grant;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            display_name: None,
            token: None,
            is_admin,
            created_at: Utc::now().into(),
        }
    }

    fn test_form(creator_id: &str, published: bool, revealed: bool) -> form::Model {
        form::Model {
            id: "f1".to_string(),
            title: "Quiz night".to_string(),
            description: None,
            is_published: published,
            results_revealed: revealed,
            results_revealed_at: None,
            creator_id: creator_id.to_string(),
            invite_token: Some("tok".to_string()),
            invite_enabled: true,
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

    /// One mocked grant lookup per element of `lookups`.
    fn service(lookups: Vec<Vec<editor_grant::Model>>) -> AccessService {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(lookups)
                .into_connection(),
        );
        AccessService::new(EditorGrantRepository::new(db))
    }

    #[test]
    fn capability_ordering() {
        assert!(Capability::None < Capability::Voter);
        assert!(Capability::Voter < Capability::Editor);
        assert!(Capability::Editor < Capability::Owner);
        assert!(Capability::Owner >= Capability::Editor);
    }

    #[tokio::test]
    async fn anonymous_callers_have_no_capability() {
        let access = service(vec![]);
        let form = test_form("owner", true, false);

        let cap = access.capability(&form, None).await.unwrap();

        assert_eq!(cap, Capability::None);
    }

    #[tokio::test]
    async fn creator_is_owner() {
        let access = service(vec![]);
        let form = test_form("alice", true, false);
        let alice = test_user("alice", false);

        let cap = access.capability(&form, Some(&alice)).await.unwrap();

        assert_eq!(cap, Capability::Owner);
    }

    #[tokio::test]
    async fn admin_is_editor_without_a_grant() {
        let access = service(vec![]);
        let form = test_form("owner", true, false);
        let admin = test_user("admin", true);

        let cap = access.capability(&form, Some(&admin)).await.unwrap();

        assert_eq!(cap, Capability::Editor);
    }

    #[tokio::test]
    async fn grant_holder_is_editor() {
        let access = service(vec![vec![test_grant("bob")]]);
        let form = test_form("owner", true, false);
        let bob = test_user("bob", false);

        let cap = access.capability(&form, Some(&bob)).await.unwrap();

        assert_eq!(cap, Capability::Editor);
    }

    #[tokio::test]
    async fn authenticated_stranger_is_voter() {
        let access = service(vec![vec![]]);
        let form = test_form("owner", true, false);
        let bob = test_user("bob", false);

        let cap = access.capability(&form, Some(&bob)).await.unwrap();

        assert_eq!(cap, Capability::Voter);
    }

    #[tokio::test]
    async fn unpublished_forms_are_hidden_from_voters() {
        let access = service(vec![vec![]]);
        let form = test_form("owner", false, false);
        let bob = test_user("bob", false);

        assert!(!access.can_read(&form, Some(&bob)).await.unwrap());
    }

    #[tokio::test]
    async fn results_need_reveal_and_own_ballot() {
        let form = test_form("owner", true, true);
        let bob = test_user("bob", false);

        let access = service(vec![vec![]]);
        assert!(!access.can_view_results(&form, Some(&bob), false).await.unwrap());

        let access = service(vec![vec![]]);
        assert!(access.can_view_results(&form, Some(&bob), true).await.unwrap());
    }

    #[tokio::test]
    async fn editors_see_results_before_reveal() {
        let access = service(vec![vec![test_grant("bob")]]);
        let form = test_form("owner", true, false);
        let bob = test_user("bob", false);

        assert!(access.can_view_results(&form, Some(&bob), false).await.unwrap());
    }

    #[tokio::test]
    async fn require_owner_rejects_editors() {
        let access = service(vec![vec![test_grant("bob")]]);
        let form = test_form("owner", true, false);
        let bob = test_user("bob", false);

        let result = access.require_owner(&form, &bob).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
