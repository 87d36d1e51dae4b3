use std::time::Instant;

use axum::{Json, extract::State};
use chrono::Utc;

use crate::domain::types::{CycleSummary, DrainSummary};
use crate::error::SchedulerError;
use crate::handlers::auth::CronAuth;
use crate::infra::db::{
    DbDispatchQueue, DbEventSource, DbIdempotencyLedger, DbLeadSource, DbSuppressionRegistry,
};
use crate::infra::delivery::ResendDelivery;
use crate::infra::pacer::IntervalPacer;
use crate::infra::renderer::DbTemplateRenderer;
use crate::state::AppState;
use crate::usecase::cycle::RunCycleUseCase;
use crate::usecase::drain::DrainQueueUseCase;
use crate::usecase::enqueue::EnqueuePhaseUseCase;

type LeadPhase = EnqueuePhaseUseCase<DbLeadSource, DbSuppressionRegistry, DbIdempotencyLedger>;
type EventPhase = EnqueuePhaseUseCase<DbEventSource, DbSuppressionRegistry, DbIdempotencyLedger>;
type Drain = DrainQueueUseCase<
    DbDispatchQueue,
    DbTemplateRenderer,
    ResendDelivery,
    std::sync::Arc<IntervalPacer>,
>;

fn lead_phase(state: &AppState) -> LeadPhase {
    EnqueuePhaseUseCase {
        source: state.lead_source(),
        suppressions: state.suppressions(),
        ledger: state.ledger(),
        sequence: state.plan.leads().clone(),
        links: state.links.clone(),
    }
}

fn event_phase(state: &AppState) -> EventPhase {
    EnqueuePhaseUseCase {
        source: state.event_source(),
        suppressions: state.suppressions(),
        ledger: state.ledger(),
        sequence: state.plan.events().clone(),
        links: state.links.clone(),
    }
}

fn drain(state: &AppState) -> Drain {
    DrainQueueUseCase {
        queue: state.queue(),
        renderer: state.renderer(),
        delivery: state.delivery.clone(),
        pacer: state.pacer.clone(),
        batch_size: state.drain_batch_size,
    }
}

// ── GET|POST /cron/cycle ──────────────────────────────────────────────────────

pub async fn run_cycle(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<Json<CycleSummary>, SchedulerError> {
    let usecase = RunCycleUseCase {
        leads: lead_phase(&state),
        events: event_phase(&state),
        drain: drain(&state),
    };
    let summary = usecase.execute(Utc::now()).await?;
    Ok(Json(summary))
}

// ── GET|POST /cron/drain ──────────────────────────────────────────────────────

pub async fn run_drain(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<Json<DrainSummary>, SchedulerError> {
    let started = Instant::now();
    let report = drain(&state).execute(Utc::now()).await?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(Json(DrainSummary::new(report, duration_ms)))
}
