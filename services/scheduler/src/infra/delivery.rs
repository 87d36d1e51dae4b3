use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::domain::repository::DeliveryChannel;
use crate::domain::types::{DeliveryReceipt, MessageTag, OutboundMessage};
use crate::error::SchedulerError;

/// Resend transactional email API.
#[derive(Clone)]
pub struct ResendDelivery {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    reply_to: Option<String>,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    html: &'a str,
    tags: Vec<Tag<'a>>,
}

#[derive(Serialize)]
struct Tag<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

impl ResendDelivery {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            reply_to,
        }
    }

    fn request_body<'a>(&'a self, message: &'a OutboundMessage) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from: &self.from,
            to: [&message.to],
            reply_to: self.reply_to.as_deref(),
            subject: &message.subject,
            html: &message.body,
            tags: message.tags.iter().map(tag).collect(),
        }
    }
}

fn tag(t: &MessageTag) -> Tag<'_> {
    Tag {
        name: &t.name,
        value: &t.value,
    }
}

impl DeliveryChannel for ResendDelivery {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, SchedulerError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(message))
            .send()
            .await
            .context("send email through resend")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SchedulerError::DeliveryRejected(format!(
                "resend returned {status}: {detail}"
            )));
        }

        let body: SendEmailResponse = response
            .json()
            .await
            .context("decode resend response")?;
        Ok(DeliveryReceipt {
            provider_message_id: body.id,
        })
    }
}
