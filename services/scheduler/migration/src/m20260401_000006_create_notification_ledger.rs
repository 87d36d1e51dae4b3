use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(ledger_table()).await?;

        // The at-most-once guarantee: concurrent cycles race on this index, the loser skips.
        manager
            .create_index(
                Index::create()
                    .table(NotificationLedger::Table)
                    .col(NotificationLedger::RenderKey)
                    .col(NotificationLedger::Recipient)
                    .col(NotificationLedger::EntityRef)
                    .unique()
                    .name("uq_notification_ledger_key")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationLedger::Table).to_owned())
            .await
    }
}

fn ledger_table() -> TableCreateStatement {
    Table::create()
        .table(NotificationLedger::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(NotificationLedger::Id)
                .uuid()
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(NotificationLedger::RenderKey)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(NotificationLedger::Recipient)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(NotificationLedger::EntityRef)
                .string()
                .not_null()
                .default(""),
        )
        .col(
            ColumnDef::new(NotificationLedger::NotificationId)
                .uuid()
                .null(),
        )
        .col(
            ColumnDef::new(NotificationLedger::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        // Purging the queue must never release a key.
        .foreign_key(
            ForeignKey::create()
                .from(NotificationLedger::Table, NotificationLedger::NotificationId)
                .to(Notifications::Table, Notifications::Id)
                .on_delete(ForeignKeyAction::SetNull),
        )
        .to_owned()
}

#[derive(Iden)]
enum NotificationLedger {
    Table,
    Id,
    RenderKey,
    Recipient,
    EntityRef,
    NotificationId,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
}
