//! Create the config_kv table (§3, §6 DB-stored admin config).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConfigKv::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ConfigKv::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(ConfigKv::Value).text().not_null())
                    .col(ColumnDef::new(ConfigKv::ValueType).string().not_null())
                    .col(
                        ColumnDef::new(ConfigKv::UpdatedAt)
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
            .drop_table(Table::drop().table(ConfigKv::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ConfigKv {
    Table,
    Key,
    Value,
    ValueType,
    UpdatedAt,
}
