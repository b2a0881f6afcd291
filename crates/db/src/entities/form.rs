//! Form entity - the root poll aggregate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Voters can only read published forms.
    pub is_published: bool,

    /// One-bit broadcast gate for aggregate results.
    pub results_revealed: bool,

    /// Set exactly when `results_revealed` is true.
    #[sea_orm(nullable)]
    pub results_revealed_at: Option<DateTimeWithTimeZone>,

    /// Immutable after creation.
    #[sea_orm(indexed)]
    pub creator_id: String,

    /// Current invite token value. Rotating replaces it, killing every
    /// previously distributed link.
    #[sea_orm(nullable)]
    pub invite_token: Option<String>,

    /// Disabling is reversible; rotation is not.
    pub invite_enabled: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_many = "super::question::Entity")]
    Question,
    #[sea_orm(has_many = "super::editor_grant::Entity")]
    EditorGrant,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::editor_grant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EditorGrant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
