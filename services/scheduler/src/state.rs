use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use nurture_domain::locale::Locale;

use crate::domain::sequence::SchedulerPlan;
use crate::handlers::auth::CronSecret;
use crate::infra::db::{
    DbDispatchQueue, DbEventSource, DbIdempotencyLedger, DbLeadSource, DbSuppressionRegistry,
};
use crate::infra::delivery::ResendDelivery;
use crate::infra::links::UnsubscribeLinks;
use crate::infra::pacer::IntervalPacer;
use crate::infra::renderer::DbTemplateRenderer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cron_secret: CronSecret,
    pub plan: Arc<SchedulerPlan>,
    pub links: UnsubscribeLinks,
    pub delivery: ResendDelivery,
    /// One pacer per process so concurrent drains still share the provider budget.
    pub pacer: Arc<IntervalPacer>,
    pub default_locale: Locale,
    pub lead_launch_date: Option<DateTime<Utc>>,
    pub drain_batch_size: u64,
}

impl AppState {
    pub fn lead_source(&self) -> DbLeadSource {
        DbLeadSource {
            db: self.db.clone(),
            launch_floor: self.lead_launch_date,
            default_locale: self.default_locale,
        }
    }

    pub fn event_source(&self) -> DbEventSource {
        DbEventSource {
            db: self.db.clone(),
            lookback_days: self.plan.events().horizon_days().ceil() as i64 + 1,
            default_locale: self.default_locale,
        }
    }

    pub fn suppressions(&self) -> DbSuppressionRegistry {
        DbSuppressionRegistry {
            db: self.db.clone(),
        }
    }

    pub fn ledger(&self) -> DbIdempotencyLedger {
        DbIdempotencyLedger {
            db: self.db.clone(),
        }
    }

    pub fn queue(&self) -> DbDispatchQueue {
        DbDispatchQueue {
            db: self.db.clone(),
        }
    }

    pub fn renderer(&self) -> DbTemplateRenderer {
        DbTemplateRenderer {
            db: self.db.clone(),
            default_locale: self.default_locale,
        }
    }
}

impl FromRef<AppState> for CronSecret {
    fn from_ref(state: &AppState) -> Self {
        state.cron_secret.clone()
    }
}
