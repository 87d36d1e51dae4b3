pub use sea_orm_migration::prelude::*;

mod m20260401_000001_create_leads;
mod m20260401_000002_create_events;
mod m20260401_000003_create_suppressions;
mod m20260401_000004_create_message_templates;
mod m20260401_000005_create_notifications;
mod m20260401_000006_create_notification_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260401_000001_create_leads::Migration),
            Box::new(m20260401_000002_create_events::Migration),
            Box::new(m20260401_000003_create_suppressions::Migration),
            Box::new(m20260401_000004_create_message_templates::Migration),
            Box::new(m20260401_000005_create_notifications::Migration),
            Box::new(m20260401_000006_create_notification_ledger::Migration),
        ]
    }
}
