use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use nurture_domain::locale::Locale;

use crate::domain::anchor::date_anchor;
use crate::domain::sequence::{
    EVENT_CATEGORY, LEAD_CATEGORY, SchedulerPlan, Sequence, SequenceError, default_event_steps,
    default_lead_steps,
};
use crate::domain::types::{AnchorKind, ExpiryPolicy, OffsetStep};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("invalid offset table: {0}")]
    Sequence(#[from] SequenceError),
}

/// Scheduler service configuration loaded from environment variables.
#[derive(Debug)]
pub struct SchedulerConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3114). Env var: `SCHEDULER_PORT`.
    pub scheduler_port: u16,
    /// Shared secret the platform cron presents on `/cron/*`.
    pub cron_secret: String,
    /// HMAC key for unsubscribe link tokens.
    pub unsubscribe_secret: String,
    /// Public origin unsubscribe links point at (e.g. "https://example.com").
    pub public_base_url: String,
    pub resend_api_key: String,
    /// Default "https://api.resend.com/emails".
    pub resend_api_url: String,
    pub resend_from_email: String,
    pub resend_reply_to: Option<String>,
    /// Template locale used when an entity has none, and as render fallback (default "fr").
    pub default_locale: Locale,
    /// Lead anchors are floored at this instant. Env var: `LEAD_LAUNCH_DATE`.
    pub lead_launch_date: Option<DateTime<Utc>>,
    pub plan: SchedulerPlan,
    /// Maximum notifications sent per drain (default 20).
    pub drain_batch_size: u64,
    /// Pause between two sends (default 600ms). Env var: `SEND_INTERVAL_MS`.
    pub send_interval: Duration,
}

const DEFAULT_PORT: u16 = 3114;
const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_LEAD_GRACE_DAYS: f64 = 1.0;
const DEFAULT_DRAIN_BATCH_SIZE: u64 = 20;
const DEFAULT_SEND_INTERVAL_MS: u64 = 600;

impl SchedulerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let default_locale = match get("DEFAULT_LOCALE") {
            Some(raw) => raw.parse().map_err(|e: nurture_domain::locale::LocaleError| {
                ConfigError::Invalid {
                    var: "DEFAULT_LOCALE",
                    reason: e.to_string(),
                }
            })?,
            None => Locale::FR,
        };

        let lead_grace = parse_or(
            get("LEAD_EXPIRY_GRACE_DAYS"),
            "LEAD_EXPIRY_GRACE_DAYS",
            DEFAULT_LEAD_GRACE_DAYS,
        )?;
        let lead_steps = parse_steps(get("LEAD_SEQUENCE"), "LEAD_SEQUENCE", default_lead_steps)?;
        let event_steps =
            parse_steps(get("EVENT_SEQUENCE"), "EVENT_SEQUENCE", default_event_steps)?;
        let plan = SchedulerPlan::new(
            Sequence::new(
                AnchorKind::Lead,
                LEAD_CATEGORY,
                lead_steps,
                Some(ExpiryPolicy {
                    grace_days: lead_grace,
                }),
            )?,
            Sequence::new(AnchorKind::Event, EVENT_CATEGORY, event_steps, None)?,
        )?;

        let lead_launch_date = get("LEAD_LAUNCH_DATE")
            .map(|raw| parse_instant(&raw))
            .transpose()
            .map_err(|reason| ConfigError::Invalid {
                var: "LEAD_LAUNCH_DATE",
                reason,
            })?;

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            scheduler_port: parse_or(get("SCHEDULER_PORT"), "SCHEDULER_PORT", DEFAULT_PORT)?,
            cron_secret: require("CRON_SECRET")?,
            unsubscribe_secret: require("UNSUBSCRIBE_SECRET")?,
            public_base_url: require("PUBLIC_BASE_URL")?,
            resend_api_key: require("RESEND_API_KEY")?,
            resend_api_url: get("RESEND_API_URL")
                .unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_owned()),
            resend_from_email: require("RESEND_FROM_EMAIL")?,
            resend_reply_to: get("RESEND_REPLY_TO"),
            default_locale,
            lead_launch_date,
            plan,
            drain_batch_size: parse_or(
                get("DRAIN_BATCH_SIZE"),
                "DRAIN_BATCH_SIZE",
                DEFAULT_DRAIN_BATCH_SIZE,
            )?,
            send_interval: Duration::from_millis(parse_or(
                get("SEND_INTERVAL_MS"),
                "SEND_INTERVAL_MS",
                DEFAULT_SEND_INTERVAL_MS,
            )?),
        })
    }
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_steps(
    raw: Option<String>,
    var: &'static str,
    default: fn() -> Vec<OffsetStep>,
) -> Result<Vec<OffsetStep>, ConfigError> {
    match raw {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default()),
    }
}

/// RFC 3339 instant, or a bare `YYYY-MM-DD` taken as midnight UTC.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(date_anchor)
        .map_err(|e| format!("{raw:?}: {e}"))
}
