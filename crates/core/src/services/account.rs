//! Administrative account management.

use pollboard_common::{AppError, AppResult};
use pollboard_db::{entities::user, repositories::UserRepository};

/// Service for admin-only account operations.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Delete a user account and everything that cascades from it
    /// (forms, responses, grants).
    ///
    /// Only admins may delete accounts, and never their own.
    pub async fn delete_user(&self, caller: &user::Model, target_id: &str) -> AppResult<()> {
        if !caller.is_admin {
            return Err(AppError::Forbidden(
                "Only admins may delete accounts".to_string(),
            ));
        }

        if caller.id == target_id {
            return Err(AppError::BadRequest(
                "Cannot delete your own account".to_string(),
            ));
        }

        let target = self
            .user_repo
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(target_id.to_string()))?;

        self.user_repo.delete(&target.id).await?;

        tracing::info!(
            admin_id = %caller.id,
            deleted_user_id = %target.id,
            deleted_username = %target.username,
            "account deleted by admin"
        );

        Ok(())
    }
}
