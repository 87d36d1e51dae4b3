use anyhow::Context as _;
use minijinja::{AutoEscape, Environment};
use sea_orm::{DatabaseConnection, EntityTrait};

use nurture_domain::locale::Locale;
use nurture_scheduler_schema::message_templates;

use crate::domain::repository::Renderer;
use crate::domain::types::RenderedMessage;
use crate::error::SchedulerError;

/// Render a stored template pair against `payload`.
///
/// `{{ field }}` interpolation; fields missing from the payload render as empty
/// strings. The body is HTML and gets its values escaped, the subject does not.
pub fn render_template(
    subject: &str,
    body: &str,
    payload: &serde_json::Value,
) -> Result<RenderedMessage, minijinja::Error> {
    let plain = Environment::new();
    let mut html = Environment::new();
    html.set_auto_escape_callback(|_| AutoEscape::Html);
    Ok(RenderedMessage {
        subject: plain.render_str(subject, payload)?,
        body: html.render_str(body, payload)?,
    })
}

/// Templates stored in `message_templates`, with a fallback locale.
#[derive(Clone)]
pub struct DbTemplateRenderer {
    pub db: DatabaseConnection,
    pub default_locale: Locale,
}

impl DbTemplateRenderer {
    async fn find(
        &self,
        key: &str,
        locale: &str,
    ) -> Result<Option<message_templates::Model>, SchedulerError> {
        let model = message_templates::Entity::find_by_id((key.to_owned(), locale.to_owned()))
            .one(&self.db)
            .await
            .context("find message template")?;
        Ok(model)
    }
}

impl Renderer for DbTemplateRenderer {
    async fn render(
        &self,
        render_key: &str,
        locale: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<RenderedMessage>, SchedulerError> {
        let mut template = self.find(render_key, locale).await?;
        if template.is_none() && locale != self.default_locale.as_str() {
            tracing::debug!(render_key, locale, "template missing, trying default locale");
            template = self.find(render_key, self.default_locale.as_str()).await?;
        }
        let Some(template) = template else {
            return Ok(None);
        };
        let rendered = render_template(&template.subject, &template.body, payload)
            .with_context(|| format!("render template {render_key}/{}", template.locale))?;
        Ok(Some(rendered))
    }
}
