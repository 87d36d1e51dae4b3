use sea_orm::entity::prelude::*;

/// Booked event; its calendar date anchors the post-event sequence.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_name: Option<String>,
    pub client_email: String,
    pub language: Option<String>,
    pub event_date: Date,
    pub address: Option<String>,
    /// `active` | `confirmed` | `cancelled`
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
