use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use nurture_domain::id::NotificationId;

use crate::domain::lifecycle::maybe_expire;
use crate::domain::repository::{AnchorSource, IdempotencyLedger, SuppressionRegistry};
use crate::domain::sequence::Sequence;
use crate::domain::types::{
    AnchoredEntity, EnqueueReport, IdempotencyKey, LifecycleStatus, NewNotification, OffsetStep,
};
use crate::domain::window;
use crate::error::SchedulerError;
use crate::infra::links::UnsubscribeLinks;

/// An enqueue phase that stopped early.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PhaseAborted {
    /// Counts committed before the failure.
    pub partial: EnqueueReport,
    #[source]
    pub error: SchedulerError,
}

impl PhaseAborted {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Queues due steps of one sequence for every active entity of its source.
pub struct EnqueuePhaseUseCase<S, R, L>
where
    S: AnchorSource,
    R: SuppressionRegistry,
    L: IdempotencyLedger,
{
    pub source: S,
    pub suppressions: R,
    pub ledger: L,
    pub sequence: Sequence,
    pub links: UnsubscribeLinks,
}

impl<S, R, L> EnqueuePhaseUseCase<S, R, L>
where
    S: AnchorSource,
    R: SuppressionRegistry,
    L: IdempotencyLedger,
{
    /// On failure the report still carries what was committed before the phase stopped.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<EnqueueReport, PhaseAborted> {
        let mut report = EnqueueReport::default();
        match self.process(now, &mut report).await {
            Ok(()) => Ok(report),
            Err(error) => Err(PhaseAborted {
                partial: report,
                error,
            }),
        }
    }

    async fn process(
        &self,
        now: DateTime<Utc>,
        report: &mut EnqueueReport,
    ) -> Result<(), SchedulerError> {
        let phase = self.sequence.kind().as_str();
        let entities = self
            .source
            .list_active(now)
            .await
            .map_err(|e| e.classify(SchedulerError::SourceUnavailable))?;

        for entity in &entities {
            // Terminal entities never re-enter the sequence, whatever the source returned.
            if entity.status != LifecycleStatus::Active {
                continue;
            }

            if let Some(step) = window::evaluate(entity.anchor_time, now, self.sequence.steps()) {
                report.due += 1;
                self.enqueue_step(entity, step, now, report).await?;
            }

            if maybe_expire(entity, now, &self.sequence) == Some(LifecycleStatus::Terminal) {
                match self.source.mark_terminal(&entity.id).await {
                    Ok(()) => {
                        report.expired += 1;
                        info!(phase, entity_ref = %entity.id, "entity reached end of sequence");
                    }
                    Err(e) => {
                        warn!(phase, entity_ref = %entity.id, error = %e, "failed to mark entity terminal");
                    }
                }
            }
        }

        info!(
            phase,
            active = entities.len(),
            due = report.due,
            queued = report.queued,
            already_queued = report.already_queued,
            suppressed = report.suppressed,
            expired = report.expired,
            "enqueue phase finished"
        );
        Ok(())
    }

    async fn enqueue_step(
        &self,
        entity: &AnchoredEntity,
        step: &OffsetStep,
        now: DateTime<Utc>,
        report: &mut EnqueueReport,
    ) -> Result<(), SchedulerError> {
        let key = IdempotencyKey {
            render_key: step.render_key.clone(),
            recipient: entity.recipient.clone(),
            entity_ref: Some(entity.id.clone()),
        };

        if self
            .ledger
            .exists(&key)
            .await
            .map_err(|e| e.classify(SchedulerError::LedgerUnavailable))?
        {
            report.already_queued += 1;
            return Ok(());
        }

        // No ledger write on suppression: only this step is skipped for good.
        if self
            .suppressions
            .is_suppressed(&entity.recipient, self.sequence.category())
            .await
            .map_err(|e| e.classify(SchedulerError::SuppressionUnavailable))?
        {
            report.suppressed += 1;
            info!(
                render_key = %step.render_key,
                entity_ref = %entity.id,
                category = self.sequence.category(),
                "recipient suppressed, step skipped"
            );
            return Ok(());
        }

        let notification = NewNotification {
            id: NotificationId::generate(),
            render_key: step.render_key.clone(),
            recipient: entity.recipient.clone(),
            locale: entity.locale,
            payload: self.payload_for(entity),
            not_before: None,
            entity_ref: Some(entity.id.clone()),
            created_at: now,
        };

        let reserved = self
            .ledger
            .reserve_and_enqueue(&key, &notification)
            .await
            .map_err(|e| e.classify(SchedulerError::LedgerUnavailable))?;
        if reserved {
            report.queued += 1;
            info!(
                render_key = %step.render_key,
                entity_ref = %entity.id,
                notification_id = %notification.id,
                "notification queued"
            );
        } else {
            report.already_queued += 1;
        }
        Ok(())
    }

    fn payload_for(&self, entity: &AnchoredEntity) -> Value {
        let mut payload = entity.payload_fields.clone();
        payload.insert(
            "unsubscribe_url".to_owned(),
            Value::String(self.links.url_for(&entity.recipient)),
        );
        Value::Object(payload)
    }
}
