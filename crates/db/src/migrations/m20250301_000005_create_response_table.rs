//! Create response table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Response::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Response::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Response::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::OptionId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::VoterId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Response::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_question")
                            .from(Response::Table, Response::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_option")
                            .from(Response::Table, Response::OptionId)
                            .to(QuestionOption::Table, QuestionOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_voter")
                            .from(Response::Table, Response::VoterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (question_id, voter_id) - one response per voter per
        // question. Final backstop against racing double-vote attempts.
        manager
            .create_index(
                Index::create()
                    .name("idx_response_question_id_voter_id")
                    .table(Response::Table)
                    .col(Response::QuestionId)
                    .col(Response::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: option_id (tally counting)
        manager
            .create_index(
                Index::create()
                    .name("idx_response_option_id")
                    .table(Response::Table)
                    .col(Response::OptionId)
                    .to_owned(),
            )
            .await?;

        // Index: voter_id (prior-ballot lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_response_voter_id")
                    .table(Response::Table)
                    .col(Response::VoterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Response::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Response {
    Table,
    Id,
    QuestionId,
    OptionId,
    VoterId,
    CreatedAt,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}

#[derive(Iden)]
enum QuestionOption {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
