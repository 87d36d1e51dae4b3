use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Suppressions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Suppressions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Suppressions::Recipient).string().not_null())
                    .col(ColumnDef::new(Suppressions::Category).string().not_null())
                    .col(ColumnDef::new(Suppressions::Reason).string())
                    .col(
                        ColumnDef::new(Suppressions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Suppressions::Table)
                    .col(Suppressions::Recipient)
                    .col(Suppressions::Category)
                    .unique()
                    .name("uq_suppressions_recipient_category")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Suppressions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Suppressions {
    Table,
    Id,
    Recipient,
    Category,
    Reason,
    CreatedAt,
}
