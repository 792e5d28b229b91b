//! Create item table migration.

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
                    .table(Item::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Item::Id)
                            .string_len(ID_MAX_LEN)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Item::UserId).string_len(ID_MAX_LEN).not_null())
                    .col(
                        ColumnDef::new(Item::Score)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Item::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for listing an author's items)
        manager
            .create_index(
                Index::create()
                    .name("idx_item_user_id")
                    .table(Item::Table)
                    .col(Item::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: score (for ranking)
        manager
            .create_index(
                Index::create()
                    .name("idx_item_score")
                    .table(Item::Table)
                    .col(Item::Score)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Item::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Item {
    Table,
    Id,
    UserId,
    Score,
    CreatedAt,
}
