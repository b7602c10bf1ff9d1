//! Create the inbox table (subscribed instances, §3).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inbox::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Inbox::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Inbox::Domain).string().not_null().unique_key())
                    .col(ColumnDef::new(Inbox::Actor).string().not_null())
                    .col(ColumnDef::new(Inbox::Inbox).string().not_null())
                    .col(ColumnDef::new(Inbox::Followid).string().not_null())
                    .col(ColumnDef::new(Inbox::Software).string().null())
                    .col(
                        ColumnDef::new(Inbox::Pending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Inbox::Failed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Inbox::FailingSince)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Inbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Inbox::UpdatedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inbox_domain")
                    .table(Inbox::Table)
                    .col(Inbox::Domain)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inbox_pending")
                    .table(Inbox::Table)
                    .col(Inbox::Pending)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inbox::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Inbox {
    Table,
    Id,
    Domain,
    Actor,
    Inbox,
    Followid,
    Software,
    Pending,
    Failed,
    FailingSince,
    CreatedAt,
    UpdatedAt,
}
