//! Create vote table migration.

use sea_orm_migration::prelude::*;

use super::ID_MAX_LEN;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(ID_MAX_LEN)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::UserId).string_len(ID_MAX_LEN).not_null())
                    .col(ColumnDef::new(Vote::ItemId).string_len(ID_MAX_LEN).not_null())
                    .col(ColumnDef::new(Vote::Direction).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Vote::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Vote::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Vote::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_item")
                            .from(Vote::Table, Vote::ItemId)
                            .to(Item::Table, Item::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, item_id) - one vote per user per item
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_user_item")
                    .table(Vote::Table)
                    .col(Vote::UserId)
                    .col(Vote::ItemId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: item_id (for recounting an item's score)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_item_id")
                    .table(Vote::Table)
                    .col(Vote::ItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    UserId,
    ItemId,
    Direction,
    Active,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Item {
    Table,
    Id,
}
