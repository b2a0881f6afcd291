//! Create question option table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QuestionOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuestionOption::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuestionOption::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(QuestionOption::Text).text().not_null())
                    .col(
                        ColumnDef::new(QuestionOption::OptionOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QuestionOption::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_option_question")
                            .from(QuestionOption::Table, QuestionOption::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (question_id, option_order) for ordered listing
        manager
            .create_index(
                Index::create()
                    .name("idx_question_option_question_id_order")
                    .table(QuestionOption::Table)
                    .col(QuestionOption::QuestionId)
                    .col(QuestionOption::OptionOrder)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuestionOption::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum QuestionOption {
    Table,
    Id,
    QuestionId,
    Text,
    OptionOrder,
    CreatedAt,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}
