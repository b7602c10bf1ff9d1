//! Create the domain_ban and software_ban tables (§3).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DomainBan::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DomainBan::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(DomainBan::Domain).string().not_null().unique_key())
                    .col(ColumnDef::new(DomainBan::Reason).text().not_null())
                    .col(ColumnDef::new(DomainBan::Note).text().null())
                    .col(
                        ColumnDef::new(DomainBan::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SoftwareBan::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SoftwareBan::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SoftwareBan::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(SoftwareBan::Reason).text().not_null())
                    .col(ColumnDef::new(SoftwareBan::Note).text().null())
                    .col(
                        ColumnDef::new(SoftwareBan::CreatedAt)
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
            .drop_table(Table::drop().table(SoftwareBan::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DomainBan::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum DomainBan {
    Table,
    Id,
    Domain,
    Reason,
    Note,
    CreatedAt,
}

#[derive(Iden)]
pub enum SoftwareBan {
    Table,
    Id,
    Name,
    Reason,
    Note,
    CreatedAt,
}
