use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use crate::error::SchedulerError;
use crate::state::AppState;
use crate::usecase::unsubscribe::{UnsubscribeInput, UnsubscribeUseCase};

const UNSUBSCRIBED_PAGE: &str = "<!doctype html>\
<html><head><meta charset=\"utf-8\"><title>Désinscription</title></head>\
<body><p>Vous ne recevrez plus ces e-mails.</p></body></html>";

#[derive(Deserialize)]
pub struct UnsubscribeQuery {
    pub email: String,
    pub token: String,
    pub category: Option<String>,
}

/// `GET /unsubscribe?email=..&token=..[&category=..]`, the target of every email footer link.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Result<Html<&'static str>, SchedulerError> {
    let usecase = UnsubscribeUseCase {
        suppressions: state.suppressions(),
        links: state.links.clone(),
    };
    usecase
        .execute(UnsubscribeInput {
            email: query.email,
            token: query.token,
            category: query.category,
        })
        .await?;
    Ok(Html(UNSUBSCRIBED_PAGE))
}
