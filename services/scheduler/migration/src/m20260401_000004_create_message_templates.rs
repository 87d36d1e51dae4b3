use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageTemplates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MessageTemplates::Key).string().not_null())
                    .col(ColumnDef::new(MessageTemplates::Locale).string().not_null())
                    .col(ColumnDef::new(MessageTemplates::Subject).string().not_null())
                    .col(ColumnDef::new(MessageTemplates::Body).text().not_null())
                    .col(
                        ColumnDef::new(MessageTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(MessageTemplates::Key)
                            .col(MessageTemplates::Locale),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageTemplates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageTemplates {
    Table,
    Key,
    Locale,
    Subject,
    Body,
    UpdatedAt,
}
