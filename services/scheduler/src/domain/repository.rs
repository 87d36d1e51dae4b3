#![allow(async_fn_in_trait)]

use std::sync::Arc;

use chrono::{DateTime, Utc};

use nurture_domain::id::{EntityRef, NotificationId};
use nurture_domain::recipient::Recipient;

use crate::domain::types::{
    AnchoredEntity, DeliveryReceipt, IdempotencyKey, NewNotification, Notification,
    OutboundMessage, RenderedMessage,
};
use crate::error::SchedulerError;

/// Supplies the entities one offset sequence is evaluated against.
pub trait AnchorSource: Send + Sync {
    /// Active entities, in a stable order.
    async fn list_active(&self, now: DateTime<Utc>)
    -> Result<Vec<AnchoredEntity>, SchedulerError>;

    /// Move an entity to its terminal status. Idempotent.
    async fn mark_terminal(&self, id: &EntityRef) -> Result<(), SchedulerError>;
}

/// Opt-out list, keyed by normalized address and category.
pub trait SuppressionRegistry: Send + Sync {
    /// True when the recipient opted out of `category` or of everything.
    async fn is_suppressed(
        &self,
        recipient: &Recipient,
        category: &str,
    ) -> Result<bool, SchedulerError>;

    /// Record an opt-out. Re-suppressing is a no-op.
    async fn suppress(
        &self,
        recipient: &Recipient,
        category: &str,
        reason: &str,
    ) -> Result<(), SchedulerError>;
}

/// Durable at-most-once record of queued notifications.
pub trait IdempotencyLedger: Send + Sync {
    async fn exists(&self, key: &IdempotencyKey) -> Result<bool, SchedulerError>;

    /// Write the ledger record and the queue item atomically.
    ///
    /// Returns `false`, with nothing written, when another writer already holds `key`.
    async fn reserve_and_enqueue(
        &self,
        key: &IdempotencyKey,
        notification: &NewNotification,
    ) -> Result<bool, SchedulerError>;
}

/// The notification work queue.
pub trait DispatchQueue: Send + Sync {
    /// Queued items whose `not_before` has passed, oldest first.
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Notification>, SchedulerError>;

    /// `queued -> sent`. Returns `false` if the item was no longer queued.
    async fn mark_sent(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
        provider_message_id: Option<&str>,
    ) -> Result<bool, SchedulerError>;

    /// `queued -> failed`. Returns `false` if the item was no longer queued.
    async fn mark_failed(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, SchedulerError>;
}

pub trait Renderer: Send + Sync {
    /// `Ok(None)` when no template exists for the key.
    async fn render(
        &self,
        render_key: &str,
        locale: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<RenderedMessage>, SchedulerError>;
}

pub trait DeliveryChannel: Send + Sync {
    /// A provider refusal is `SchedulerError::DeliveryRejected`.
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, SchedulerError>;
}

/// Waits as needed so consecutive sends respect the provider's rate limit.
pub trait SendPacer: Send + Sync {
    async fn pace(&self);
}

impl<P: SendPacer> SendPacer for Arc<P> {
    async fn pace(&self) {
        P::pace(self.as_ref()).await
    }
}
