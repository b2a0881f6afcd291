//! User service.
//!
//! Thin wrapper over the local identity projection. Authentication itself is
//! delegated to the external identity provider; this service only resolves
//! bearer tokens and usernames against the local user table.

use chrono::Utc;
use pollboard_common::{AppError, AppResult, IdGenerator};
use pollboard_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use validator::Validate;

/// User service for identity lookups.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a user projection.
#[derive(Debug, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(length(max = 256))]
    pub display_name: Option<String>,
    pub is_admin: bool,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Authenticate a user by bearer token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_username(username).await
    }

    /// Create a user projection with a fresh bearer token.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            display_name: Set(input.display_name),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(input.is_admin),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }
}
