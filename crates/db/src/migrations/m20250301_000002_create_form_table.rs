//! Create form table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Form::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Form::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Form::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Form::Description).text())
                    .col(ColumnDef::new(Form::IsPublished).boolean().not_null().default(false))
                    .col(ColumnDef::new(Form::ResultsRevealed).boolean().not_null().default(false))
                    .col(ColumnDef::new(Form::ResultsRevealedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Form::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Form::InviteToken).string_len(64))
                    .col(ColumnDef::new(Form::InviteEnabled).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Form::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Form::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_creator")
                            .from(Form::Table, Form::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: creator_id
        manager
            .create_index(
                Index::create()
                    .name("idx_form_creator_id")
                    .table(Form::Table)
                    .col(Form::CreatorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Form::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Form {
    Table,
    Id,
    Title,
    Description,
    IsPublished,
    ResultsRevealed,
    ResultsRevealedAt,
    CreatorId,
    InviteToken,
    InviteEnabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
