//! Create the whitelist table (§3).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Whitelist::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Whitelist::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Whitelist::Domain).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Whitelist::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Whitelist::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Whitelist {
    Table,
    Id,
    Domain,
    CreatedAt,
}
