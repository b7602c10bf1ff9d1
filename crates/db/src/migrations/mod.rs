//! Ordered, idempotent, forward-only schema migrations (§4.A).

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_inbox_table;
mod m20250101_000002_create_ban_tables;
mod m20250101_000003_create_whitelist_table;
mod m20250101_000004_create_user_and_token_tables;
mod m20250101_000005_create_config_kv_table;
mod m20250101_000006_create_cache_row_table;
mod m20250101_000007_seed_schema_version;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_inbox_table::Migration),
            Box::new(m20250101_000002_create_ban_tables::Migration),
            Box::new(m20250101_000003_create_whitelist_table::Migration),
            Box::new(m20250101_000004_create_user_and_token_tables::Migration),
            Box::new(m20250101_000005_create_config_kv_table::Migration),
            Box::new(m20250101_000006_create_cache_row_table::Migration),
            Box::new(m20250101_000007_seed_schema_version::Migration),
        ]
    }
}
