//! User entity.
//!
//! A local projection of the external identity provider: enough to satisfy
//! foreign keys, the bearer-token lookup, and the administrator check.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Username as entered.
    pub username: String,

    /// Lowercased username for case-insensitive lookup.
    #[sea_orm(indexed)]
    pub username_lower: String,

    /// Display name shown in presence lists.
    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// Opaque bearer token for API authentication.
    #[sea_orm(nullable, unique)]
    pub token: Option<String>,

    /// Global administrator flag. Administrators pass every capability
    /// check without needing editor grants.
    pub is_admin: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::form::Entity")]
    Form,
    #[sea_orm(has_many = "super::editor_grant::Entity")]
    EditorGrant,
    #[sea_orm(has_many = "super::response::Entity")]
    Response,
}

impl Related<super::form::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Form.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
