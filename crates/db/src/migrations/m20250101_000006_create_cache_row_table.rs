//! Create the cache_row table, used when `cache_type = database` (§4.B).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CacheRow::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CacheRow::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(CacheRow::Namespace).string().not_null())
                    .col(ColumnDef::new(CacheRow::CacheKey).string().not_null())
                    .col(ColumnDef::new(CacheRow::Value).text().not_null())
                    .col(ColumnDef::new(CacheRow::ValueType).string().not_null())
                    .col(
                        ColumnDef::new(CacheRow::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cache_row_namespace_key")
                    .table(CacheRow::Table)
                    .col(CacheRow::Namespace)
                    .col(CacheRow::CacheKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CacheRow::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CacheRow {
    Table,
    Id,
    Namespace,
    CacheKey,
    Value,
    ValueType,
    UpdatedAt,
}
