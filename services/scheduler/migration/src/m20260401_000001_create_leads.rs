use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::Email).string().not_null())
                    .col(ColumnDef::new(Leads::Name).string())
                    .col(ColumnDef::new(Leads::Language).string())
                    .col(
                        ColumnDef::new(Leads::Status)
                            .string()
                            .not_null()
                            .default("progress"),
                    )
                    .col(ColumnDef::new(Leads::EventDate).date())
                    .col(ColumnDef::new(Leads::EventPlace).string())
                    .col(
                        ColumnDef::new(Leads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Cycle scan: active leads oldest first.
        manager
            .create_index(
                Index::create()
                    .table(Leads::Table)
                    .col(Leads::Status)
                    .col(Leads::CreatedAt)
                    .name("idx_leads_status_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Leads {
    Table,
    Id,
    Email,
    Name,
    Language,
    Status,
    EventDate,
    EventPlace,
    CreatedAt,
    UpdatedAt,
}
