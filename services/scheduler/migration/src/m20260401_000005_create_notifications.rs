use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::RenderKey).string().not_null())
                    .col(ColumnDef::new(Notifications::Recipient).string().not_null())
                    .col(ColumnDef::new(Notifications::Locale).string().not_null())
                    .col(
                        ColumnDef::new(Notifications::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::NotBefore).timestamp_with_time_zone())
                    .col(ColumnDef::new(Notifications::EntityRef).string())
                    .col(
                        ColumnDef::new(Notifications::Status)
                            .string()
                            .not_null()
                            .default("queued"),
                    )
                    .col(ColumnDef::new(Notifications::Error).string())
                    .col(ColumnDef::new(Notifications::ProviderMessageId).string())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::SentAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Drain poll: queued items oldest first.
        manager
            .create_index(
                Index::create()
                    .table(Notifications::Table)
                    .col(Notifications::Status)
                    .col(Notifications::CreatedAt)
                    .name("idx_notifications_status_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    RenderKey,
    Recipient,
    Locale,
    Payload,
    NotBefore,
    EntityRef,
    Status,
    Error,
    ProviderMessageId,
    CreatedAt,
    SentAt,
}
