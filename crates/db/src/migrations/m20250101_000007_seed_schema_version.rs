//! Seed the `schema-version` row in `config_kv` once the schema settles.

use sea_orm_migration::prelude::*;

const SCHEMA_VERSION: &str = "7";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let insert = Query::insert()
            .into_table(ConfigKv::Table)
            .columns([ConfigKv::Key, ConfigKv::Value, ConfigKv::ValueType, ConfigKv::UpdatedAt])
            .values_panic([
                "schema-version".into(),
                SCHEMA_VERSION.into(),
                "int".into(),
                Expr::current_timestamp().into(),
            ])
            .to_owned();
        db.execute(db.get_database_backend().build(&insert)).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let delete = Query::delete()
            .from_table(ConfigKv::Table)
            .and_where(Expr::col(ConfigKv::Key).eq("schema-version"))
            .to_owned();
        db.execute(db.get_database_backend().build(&delete)).await?;
        Ok(())
    }
}

#[derive(Iden)]
enum ConfigKv {
    Table,
    Key,
    Value,
    ValueType,
    UpdatedAt,
}
