use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nurture_domain::id::{EntityRef, NotificationId};
use nurture_domain::locale::Locale;
use nurture_domain::recipient::Recipient;

/// Which population an entity (and its offset sequence) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorKind {
    Lead,
    Event,
}

impl AnchorKind {
    /// Phase name used in logs and in `queued_by_phase`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "leads",
            Self::Event => "events",
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Active,
    Terminal,
}

/// An entity as seen by the scheduler, whatever table it came from.
#[derive(Debug, Clone)]
pub struct AnchoredEntity {
    pub id: EntityRef,
    pub recipient: Recipient,
    pub locale: Locale,
    pub anchor_time: DateTime<Utc>,
    pub status: LifecycleStatus,
    /// Merged into the render payload.
    pub payload_fields: serde_json::Map<String, serde_json::Value>,
}

fn default_tolerance() -> f64 {
    0.5
}

/// One eligible notification: `render_key` is due `day_offset` days after the anchor,
/// give or take `tolerance_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetStep {
    pub day_offset: u32,
    pub render_key: String,
    #[serde(default = "default_tolerance")]
    pub tolerance_days: f64,
}

impl OffsetStep {
    pub fn new(day_offset: u32, render_key: impl Into<String>, tolerance_days: f64) -> Self {
        Self {
            day_offset,
            render_key: render_key.into(),
            tolerance_days,
        }
    }
}

/// Entities still active this many days past the last offset become terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryPolicy {
    pub grace_days: f64,
}

/// At-most-once key: `(render_key, recipient, entity)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub render_key: String,
    pub recipient: Recipient,
    pub entity_ref: Option<EntityRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Queued,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown notification status {other:?}")),
        }
    }
}

/// Queue item written by the enqueue phase.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub id: NotificationId,
    pub render_key: String,
    pub recipient: Recipient,
    pub locale: Locale,
    pub payload: serde_json::Value,
    pub not_before: Option<DateTime<Utc>>,
    pub entity_ref: Option<EntityRef>,
    pub created_at: DateTime<Utc>,
}

/// Queue item as read back by the drain phase.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub render_key: String,
    pub recipient: String,
    pub locale: String,
    pub payload: serde_json::Value,
    pub not_before: Option<DateTime<Utc>>,
    pub entity_ref: Option<EntityRef>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub tags: Vec<MessageTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub provider_message_id: Option<String>,
}

/// Outcome counters of one enqueue phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnqueueReport {
    pub due: u64,
    pub queued: u64,
    pub already_queued: u64,
    pub suppressed: u64,
    pub expired: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
}

/// JSON body returned by the cycle trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub queued_by_phase: BTreeMap<String, u64>,
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
    pub duration_ms: u64,
}

/// JSON body returned by the drain-only trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
    pub duration_ms: u64,
}

impl DrainSummary {
    pub fn new(report: DrainReport, duration_ms: u64) -> Self {
        Self {
            processed: report.processed,
            sent: report.sent,
            failed: report.failed,
            duration_ms,
        }
    }
}
