//! Test helpers: an in-memory sqlite database with migrations applied.

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::migrations::Migrator;

/// Opens a fresh in-memory sqlite database and runs every migration against it.
pub async fn in_memory_db() -> Result<DatabaseConnection, DbErr> {
    let conn = Database::connect("sqlite::memory:").await?;
    Migrator::up(&conn, None).await?;
    Ok(conn)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_db_applies_all_migrations() {
        let db = in_memory_db().await.unwrap();
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
    }
}
