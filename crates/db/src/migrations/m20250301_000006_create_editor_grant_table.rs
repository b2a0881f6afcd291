//! Create editor grant table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EditorGrant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EditorGrant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EditorGrant::FormId).string_len(32).not_null())
                    .col(ColumnDef::new(EditorGrant::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(EditorGrant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_editor_grant_form")
                            .from(EditorGrant::Table, EditorGrant::FormId)
                            .to(Form::Table, Form::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_editor_grant_user")
                            .from(EditorGrant::Table, EditorGrant::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (form_id, user_id) - at most one grant per pair.
        // Concurrent invite redemption relies on this, not on the
        // application-level check.
        manager
            .create_index(
                Index::create()
                    .name("idx_editor_grant_form_id_user_id")
                    .table(EditorGrant::Table)
                    .col(EditorGrant::FormId)
                    .col(EditorGrant::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EditorGrant::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EditorGrant {
    Table,
    Id,
    FormId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Form {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
