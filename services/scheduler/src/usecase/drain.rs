use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::domain::repository::{DeliveryChannel, DispatchQueue, Renderer, SendPacer};
use crate::domain::types::{DeliveryReceipt, DrainReport, MessageTag, Notification, OutboundMessage};
use crate::error::SchedulerError;

/// Sends a bounded batch of due notifications, one at a time.
pub struct DrainQueueUseCase<Q, R, D, P>
where
    Q: DispatchQueue,
    R: Renderer,
    D: DeliveryChannel,
    P: SendPacer,
{
    pub queue: Q,
    pub renderer: R,
    pub delivery: D,
    pub pacer: P,
    pub batch_size: u64,
}

impl<Q, R, D, P> DrainQueueUseCase<Q, R, D, P>
where
    Q: DispatchQueue,
    R: Renderer,
    D: DeliveryChannel,
    P: SendPacer,
{
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<DrainReport, SchedulerError> {
        let items = self
            .queue
            .list_due(now, self.batch_size)
            .await
            .map_err(|e| e.classify(SchedulerError::QueueUnavailable))?;

        let mut report = DrainReport::default();
        for item in &items {
            report.processed += 1;
            match self.deliver(item).await {
                Ok(receipt) => {
                    report.sent += 1;
                    let marked = self
                        .queue
                        .mark_sent(item.id, Utc::now(), receipt.provider_message_id.as_deref())
                        .await;
                    log_transition(item, "sent", marked);
                }
                Err(reason) => {
                    report.failed += 1;
                    warn!(
                        notification_id = %item.id,
                        render_key = %item.render_key,
                        error = %reason,
                        "notification failed"
                    );
                    let marked = self.queue.mark_failed(item.id, Utc::now(), &reason).await;
                    log_transition(item, "failed", marked);
                }
            }
        }

        info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            "drain finished"
        );
        Ok(report)
    }

    /// Render then send one item. The error is the reason stored on the item.
    async fn deliver(&self, item: &Notification) -> Result<DeliveryReceipt, String> {
        let rendered = match self
            .renderer
            .render(&item.render_key, &item.locale, &item.payload)
            .await
        {
            Ok(Some(rendered)) => rendered,
            Ok(None) => {
                return Err(format!(
                    "template not found: {}/{}",
                    item.render_key, item.locale
                ));
            }
            Err(e) => return Err(format!("render error: {}", describe(&e))),
        };

        let message = OutboundMessage {
            to: item.recipient.clone(),
            subject: rendered.subject,
            body: rendered.body,
            tags: vec![
                MessageTag {
                    name: "template".to_owned(),
                    value: item.render_key.clone(),
                },
                MessageTag {
                    name: "entity_ref".to_owned(),
                    value: item
                        .entity_ref
                        .as_ref()
                        .map_or_else(|| "none".to_owned(), ToString::to_string),
                },
            ],
        };

        self.pacer.pace().await;
        self.delivery
            .send(&message)
            .await
            .map_err(|e| format!("delivery error: {}", describe(&e)))
    }
}

fn describe(e: &SchedulerError) -> String {
    match e {
        SchedulerError::DeliveryRejected(detail) => detail.clone(),
        SchedulerError::Internal(cause) => format!("{cause:#}"),
        other => other.to_string(),
    }
}

fn log_transition(item: &Notification, to: &'static str, marked: Result<bool, SchedulerError>) {
    match marked {
        Ok(true) => {}
        Ok(false) => {
            warn!(notification_id = %item.id, to, "notification already left the queue");
        }
        Err(e) => {
            error!(notification_id = %item.id, to, error = %describe(&e), "failed to record notification outcome");
        }
    }
}
