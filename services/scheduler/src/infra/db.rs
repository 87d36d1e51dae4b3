use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use nurture_domain::id::{EntityRef, NotificationId};
use nurture_domain::locale::Locale;
use nurture_domain::recipient::Recipient;
use nurture_scheduler_schema::{events, leads, notification_ledger, notifications, suppressions};

use crate::domain::anchor::{date_anchor, floored_anchor};
use crate::domain::repository::{
    AnchorSource, DispatchQueue, IdempotencyLedger, SuppressionRegistry,
};
use crate::domain::types::{
    AnchoredEntity, IdempotencyKey, LifecycleStatus, NewNotification, Notification,
    NotificationStatus,
};
use crate::error::SchedulerError;

const LEAD_ACTIVE: &str = "progress";
const LEAD_ABANDONED: &str = "abandoned";
const EVENT_LIVE_STATUSES: [&str; 2] = ["active", "confirmed"];
/// Suppression category matching every sequence.
pub const ALL_CATEGORIES: &str = "*";
const MAX_ERROR_LEN: usize = 1000;

fn insert_opt(fields: &mut Map<String, Value>, name: &str, value: Option<String>) {
    // Absent rather than null: templates render undefined fields as empty.
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        fields.insert(name.to_owned(), Value::String(value));
    }
}

fn parse_recipient(raw: &str, source: &'static str, id: Uuid) -> Option<Recipient> {
    match raw.parse() {
        Ok(recipient) => Some(recipient),
        Err(e) => {
            tracing::warn!(source, entity_ref = %id, error = %e, "skipping entity with invalid address");
            None
        }
    }
}

// ── Lead source ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLeadSource {
    pub db: DatabaseConnection,
    pub launch_floor: Option<DateTime<Utc>>,
    pub default_locale: Locale,
}

impl DbLeadSource {
    fn to_entity(&self, model: leads::Model) -> Option<AnchoredEntity> {
        let recipient = parse_recipient(&model.email, "leads", model.id)?;
        let mut fields = Map::new();
        insert_opt(&mut fields, "name", model.name);
        insert_opt(&mut fields, "email", Some(recipient.to_string()));
        insert_opt(
            &mut fields,
            "event_date",
            model.event_date.map(|d| d.format("%Y-%m-%d").to_string()),
        );
        insert_opt(&mut fields, "event_place", model.event_place);
        Some(AnchoredEntity {
            id: model.id.into(),
            recipient,
            locale: Locale::parse_or(model.language.as_deref(), self.default_locale),
            anchor_time: floored_anchor(model.created_at, self.launch_floor),
            status: if model.status == LEAD_ACTIVE {
                LifecycleStatus::Active
            } else {
                LifecycleStatus::Terminal
            },
            payload_fields: fields,
        })
    }
}

impl AnchorSource for DbLeadSource {
    async fn list_active(
        &self,
        _now: DateTime<Utc>,
    ) -> Result<Vec<AnchoredEntity>, SchedulerError> {
        let models = leads::Entity::find()
            .filter(leads::Column::Status.eq(LEAD_ACTIVE))
            .order_by_asc(leads::Column::CreatedAt)
            .order_by_asc(leads::Column::Id)
            .all(&self.db)
            .await
            .context("list active leads")?;
        Ok(models.into_iter().filter_map(|m| self.to_entity(m)).collect())
    }

    async fn mark_terminal(&self, id: &EntityRef) -> Result<(), SchedulerError> {
        let id = Uuid::parse_str(id.as_str()).context("parse lead id")?;
        leads::Entity::update_many()
            .col_expr(leads::Column::Status, Expr::value(LEAD_ABANDONED))
            .col_expr(leads::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(leads::Column::Id.eq(id))
            .filter(leads::Column::Status.eq(LEAD_ACTIVE))
            .exec(&self.db)
            .await
            .context("mark lead abandoned")?;
        Ok(())
    }
}

// ── Event source ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventSource {
    pub db: DatabaseConnection,
    /// Events older than this cannot have a step ahead of them.
    pub lookback_days: i64,
    pub default_locale: Locale,
}

impl DbEventSource {
    fn to_entity(&self, model: events::Model) -> Option<AnchoredEntity> {
        let recipient = parse_recipient(&model.client_email, "events", model.id)?;
        let mut fields = Map::new();
        insert_opt(&mut fields, "name", model.client_name);
        insert_opt(&mut fields, "email", Some(recipient.to_string()));
        insert_opt(
            &mut fields,
            "event_date",
            Some(model.event_date.format("%Y-%m-%d").to_string()),
        );
        insert_opt(&mut fields, "address", model.address);
        Some(AnchoredEntity {
            id: model.id.into(),
            recipient,
            locale: Locale::parse_or(model.language.as_deref(), self.default_locale),
            anchor_time: date_anchor(model.event_date),
            status: LifecycleStatus::Active,
            payload_fields: fields,
        })
    }
}

impl AnchorSource for DbEventSource {
    async fn list_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnchoredEntity>, SchedulerError> {
        let earliest = (now - Duration::days(self.lookback_days)).date_naive();
        let models = events::Entity::find()
            .filter(events::Column::Status.is_in(EVENT_LIVE_STATUSES))
            .filter(events::Column::EventDate.gte(earliest))
            .filter(events::Column::EventDate.lte(now.date_naive()))
            .order_by_asc(events::Column::EventDate)
            .order_by_asc(events::Column::Id)
            .all(&self.db)
            .await
            .context("list recent events")?;
        Ok(models.into_iter().filter_map(|m| self.to_entity(m)).collect())
    }

    /// Events carry no nurturing status; their sequence has no expiry.
    async fn mark_terminal(&self, _id: &EntityRef) -> Result<(), SchedulerError> {
        Ok(())
    }
}

// ── Suppression registry ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSuppressionRegistry {
    pub db: DatabaseConnection,
}

impl SuppressionRegistry for DbSuppressionRegistry {
    async fn is_suppressed(
        &self,
        recipient: &Recipient,
        category: &str,
    ) -> Result<bool, SchedulerError> {
        let count = suppressions::Entity::find()
            .filter(suppressions::Column::Recipient.eq(recipient.as_str()))
            .filter(suppressions::Column::Category.is_in([category, ALL_CATEGORIES]))
            .count(&self.db)
            .await
            .context("check suppression")?;
        Ok(count > 0)
    }

    async fn suppress(
        &self,
        recipient: &Recipient,
        category: &str,
        reason: &str,
    ) -> Result<(), SchedulerError> {
        suppressions::Entity::insert(suppressions::ActiveModel {
            id: Set(Uuid::now_v7()),
            recipient: Set(recipient.to_string()),
            category: Set(category.to_owned()),
            reason: Set(Some(reason.to_owned())),
            created_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::columns([
                suppressions::Column::Recipient,
                suppressions::Column::Category,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("insert suppression")?;
        Ok(())
    }
}

// ── Idempotency ledger ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbIdempotencyLedger {
    pub db: DatabaseConnection,
}

/// Stored form of the optional entity part of a key.
fn ledger_entity_ref(key: &IdempotencyKey) -> String {
    key.entity_ref
        .as_ref()
        .map(|e| e.as_str().to_owned())
        .unwrap_or_default()
}

impl IdempotencyLedger for DbIdempotencyLedger {
    async fn exists(&self, key: &IdempotencyKey) -> Result<bool, SchedulerError> {
        let count = notification_ledger::Entity::find()
            .filter(notification_ledger::Column::RenderKey.eq(key.render_key.as_str()))
            .filter(notification_ledger::Column::Recipient.eq(key.recipient.as_str()))
            .filter(notification_ledger::Column::EntityRef.eq(ledger_entity_ref(key)))
            .count(&self.db)
            .await
            .context("check idempotency ledger")?;
        Ok(count > 0)
    }

    async fn reserve_and_enqueue(
        &self,
        key: &IdempotencyKey,
        notification: &NewNotification,
    ) -> Result<bool, SchedulerError> {
        let reserved = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let key = key.clone();
                let notification = notification.clone();
                Box::pin(async move {
                    insert_notification(txn, &notification).await?;
                    if insert_ledger_entry(txn, &key, &notification).await? {
                        return Ok(true);
                    }
                    // Lost the race on the unique key: drop our queue row.
                    notifications::Entity::delete_by_id(notification.id.0)
                        .exec(txn)
                        .await?;
                    Ok(false)
                })
            })
            .await
            .context("reserve idempotency key")?;
        Ok(reserved)
    }
}

async fn insert_notification(
    txn: &DatabaseTransaction,
    notification: &NewNotification,
) -> Result<(), sea_orm::DbErr> {
    notifications::ActiveModel {
        id: Set(notification.id.0),
        render_key: Set(notification.render_key.clone()),
        recipient: Set(notification.recipient.to_string()),
        locale: Set(notification.locale.to_string()),
        payload: Set(notification.payload.clone()),
        not_before: Set(notification.not_before),
        entity_ref: Set(notification.entity_ref.as_ref().map(ToString::to_string)),
        status: Set(NotificationStatus::Queued.as_str().to_owned()),
        error: Set(None),
        provider_message_id: Set(None),
        created_at: Set(notification.created_at),
        sent_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

/// `true` if the row was written, `false` if the key was already taken.
async fn insert_ledger_entry(
    txn: &DatabaseTransaction,
    key: &IdempotencyKey,
    notification: &NewNotification,
) -> Result<bool, sea_orm::DbErr> {
    let inserted = notification_ledger::Entity::insert(notification_ledger::ActiveModel {
        id: Set(Uuid::now_v7()),
        render_key: Set(key.render_key.clone()),
        recipient: Set(key.recipient.to_string()),
        entity_ref: Set(ledger_entity_ref(key)),
        notification_id: Set(Some(notification.id.0)),
        created_at: Set(notification.created_at),
    })
    .on_conflict(
        OnConflict::columns([
            notification_ledger::Column::RenderKey,
            notification_ledger::Column::Recipient,
            notification_ledger::Column::EntityRef,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;
    Ok(inserted > 0)
}

// ── Dispatch queue ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDispatchQueue {
    pub db: DatabaseConnection,
}

impl DispatchQueue for DbDispatchQueue {
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Notification>, SchedulerError> {
        let models = notifications::Entity::find()
            .filter(notifications::Column::Status.eq(NotificationStatus::Queued.as_str()))
            .filter(
                Condition::any()
                    .add(notifications::Column::NotBefore.is_null())
                    .add(notifications::Column::NotBefore.lte(now)),
            )
            .order_by_asc(notifications::Column::CreatedAt)
            .order_by_asc(notifications::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list due notifications")?;
        let items = models
            .into_iter()
            .map(notification_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    }

    async fn mark_sent(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
        provider_message_id: Option<&str>,
    ) -> Result<bool, SchedulerError> {
        let result = notifications::Entity::update_many()
            .col_expr(
                notifications::Column::Status,
                Expr::value(NotificationStatus::Sent.as_str()),
            )
            .col_expr(notifications::Column::SentAt, Expr::value(at))
            .col_expr(
                notifications::Column::ProviderMessageId,
                Expr::value(provider_message_id.map(str::to_owned)),
            )
            .filter(notifications::Column::Id.eq(id.0))
            .filter(notifications::Column::Status.eq(NotificationStatus::Queued.as_str()))
            .exec(&self.db)
            .await
            .context("mark notification sent")?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_failed(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, SchedulerError> {
        let error: String = error.chars().take(MAX_ERROR_LEN).collect();
        let result = notifications::Entity::update_many()
            .col_expr(
                notifications::Column::Status,
                Expr::value(NotificationStatus::Failed.as_str()),
            )
            .col_expr(notifications::Column::SentAt, Expr::value(at))
            .col_expr(notifications::Column::Error, Expr::value(error))
            .filter(notifications::Column::Id.eq(id.0))
            .filter(notifications::Column::Status.eq(NotificationStatus::Queued.as_str()))
            .exec(&self.db)
            .await
            .context("mark notification failed")?;
        Ok(result.rows_affected > 0)
    }
}

fn notification_from_model(model: notifications::Model) -> anyhow::Result<Notification> {
    let status = model
        .status
        .parse::<NotificationStatus>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("notification {}", model.id))?;
    Ok(Notification {
        id: model.id.into(),
        render_key: model.render_key,
        recipient: model.recipient,
        locale: model.locale,
        payload: model.payload,
        not_before: model.not_before,
        entity_ref: model.entity_ref.map(EntityRef::new),
        status,
        created_at: model.created_at,
    })
}
