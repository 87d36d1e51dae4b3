use sea_orm::entity::prelude::*;

/// Dispatch queue item: `queued` until the drain marks it `sent` or `failed`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub render_key: String,
    pub recipient: String,
    pub locale: String,
    pub payload: Json,
    pub not_before: Option<chrono::DateTime<chrono::Utc>>,
    pub entity_ref: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::notification_ledger::Entity")]
    LedgerEntry,
}

impl Related<super::notification_ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
