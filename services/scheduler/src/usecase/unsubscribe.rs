use tracing::info;

use nurture_domain::recipient::Recipient;

use crate::domain::repository::SuppressionRegistry;
use crate::error::SchedulerError;
use crate::infra::db::ALL_CATEGORIES;
use crate::infra::links::UnsubscribeLinks;

pub const UNSUBSCRIBE_REASON: &str = "unsubscribe_link";

pub struct UnsubscribeInput {
    pub email: String,
    pub token: String,
    /// Opt out of one category only; every category when absent.
    pub category: Option<String>,
}

/// Records an opt-out from a signed link.
///
/// Notifications already queued for the address are left alone: suppression is
/// checked when enqueueing, never when sending.
pub struct UnsubscribeUseCase<R>
where
    R: SuppressionRegistry,
{
    pub suppressions: R,
    pub links: UnsubscribeLinks,
}

impl<R> UnsubscribeUseCase<R>
where
    R: SuppressionRegistry,
{
    pub async fn execute(&self, input: UnsubscribeInput) -> Result<(), SchedulerError> {
        // A malformed address cannot carry a valid token; don't say which part was wrong.
        let recipient: Recipient = input
            .email
            .parse()
            .map_err(|_| SchedulerError::InvalidUnsubscribeToken)?;
        if !self.links.verify(&recipient, &input.token) {
            return Err(SchedulerError::InvalidUnsubscribeToken);
        }

        let category = input
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CATEGORIES);
        self.suppressions
            .suppress(&recipient, category, UNSUBSCRIBE_REASON)
            .await?;
        info!(category, "recipient unsubscribed");
        Ok(())
    }
}
