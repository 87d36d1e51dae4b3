#![allow(async_fn_in_trait)]

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::domain::repository::{
    AnchorSource, DeliveryChannel, DispatchQueue, IdempotencyLedger, Renderer, SendPacer,
    SuppressionRegistry,
};
use crate::domain::types::{AnchorKind, CycleSummary, DrainReport, EnqueueReport};
use crate::error::SchedulerError;
use crate::usecase::drain::DrainQueueUseCase;
use crate::usecase::enqueue::{EnqueuePhaseUseCase, PhaseAborted};

/// One enqueue pass over one anchor source.
pub trait EnqueuePhase: Send + Sync {
    fn kind(&self) -> AnchorKind;
    async fn run(&self, now: DateTime<Utc>) -> Result<EnqueueReport, PhaseAborted>;
}

pub trait DrainPhase: Send + Sync {
    async fn run(&self, now: DateTime<Utc>) -> Result<DrainReport, SchedulerError>;
}

impl<S, R, L> EnqueuePhase for EnqueuePhaseUseCase<S, R, L>
where
    S: AnchorSource,
    R: SuppressionRegistry,
    L: IdempotencyLedger,
{
    fn kind(&self) -> AnchorKind {
        self.sequence.kind()
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<EnqueueReport, PhaseAborted> {
        self.execute(now).await
    }
}

impl<Q, R, D, P> DrainPhase for DrainQueueUseCase<Q, R, D, P>
where
    Q: DispatchQueue,
    R: Renderer,
    D: DeliveryChannel,
    P: SendPacer,
{
    async fn run(&self, now: DateTime<Utc>) -> Result<DrainReport, SchedulerError> {
        self.execute(now).await
    }
}

/// Both enqueue phases, then one drain.
///
/// Holds no state between invocations: overlapping or repeated cycles are made safe
/// by the ledger's unique key and the queue's one-way transitions.
pub struct RunCycleUseCase<A, B, D>
where
    A: EnqueuePhase,
    B: EnqueuePhase,
    D: DrainPhase,
{
    pub leads: A,
    pub events: B,
    pub drain: D,
}

impl<A, B, D> RunCycleUseCase<A, B, D>
where
    A: EnqueuePhase,
    B: EnqueuePhase,
    D: DrainPhase,
{
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<CycleSummary, SchedulerError> {
        let started = Instant::now();
        let mut summary = CycleSummary::default();
        let mut failures = Vec::new();

        let leads = self.leads.run(now).await;
        record_phase(self.leads.kind(), leads, &mut summary, &mut failures)?;
        let events = self.events.run(now).await;
        record_phase(self.events.kind(), events, &mut summary, &mut failures)?;

        let queued: u64 = summary.queued_by_phase.values().sum();
        if failures.len() == 2 && queued == 0 {
            // No phase made any progress.
            return Err(failures.swap_remove(0));
        }

        match self.drain.run(now).await {
            Ok(report) => {
                summary.processed = report.processed;
                summary.sent = report.sent;
                summary.failed = report.failed;
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "drain aborted");
            }
        }

        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            queued,
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "cycle finished"
        );
        Ok(summary)
    }
}

/// Fold one phase outcome into the summary.
///
/// An aborted phase still reports what it committed before stopping. A ledger failure
/// aborts the cycle: carrying on could queue a key twice. Any other failure only costs
/// the rest of that phase.
fn record_phase(
    kind: AnchorKind,
    outcome: Result<EnqueueReport, PhaseAborted>,
    summary: &mut CycleSummary,
    failures: &mut Vec<SchedulerError>,
) -> Result<(), SchedulerError> {
    let queued = match outcome {
        Ok(report) => report.queued,
        Err(PhaseAborted { partial, error }) => {
            error!(
                phase = kind.as_str(),
                kind = error.kind(),
                queued = partial.queued,
                error = %error,
                "enqueue phase aborted"
            );
            if matches!(error, SchedulerError::LedgerUnavailable(_)) {
                return Err(error);
            }
            failures.push(error);
            partial.queued
        }
    };
    summary.queued_by_phase.insert(kind.as_str().to_owned(), queued);
    Ok(())
}
