use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Scheduler service error variants.
///
/// Repositories surface infrastructure failures as `Internal` through anyhow's
/// `.context(..)?`; use cases reclassify them with [`SchedulerError::classify`]
/// so the cycle can tell which collaborator failed.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid unsubscribe token")]
    InvalidUnsubscribeToken,
    #[error("anchor source unavailable")]
    SourceUnavailable(#[source] anyhow::Error),
    #[error("suppression registry unavailable")]
    SuppressionUnavailable(#[source] anyhow::Error),
    #[error("idempotency ledger unavailable")]
    LedgerUnavailable(#[source] anyhow::Error),
    #[error("dispatch queue unavailable")]
    QueueUnavailable(#[source] anyhow::Error),
    #[error("delivery rejected: {0}")]
    DeliveryRejected(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl SchedulerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidUnsubscribeToken => "INVALID_UNSUBSCRIBE_TOKEN",
            Self::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            Self::SuppressionUnavailable(_) => "SUPPRESSION_UNAVAILABLE",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            Self::QueueUnavailable(_) => "QUEUE_UNAVAILABLE",
            Self::DeliveryRejected(_) => "DELIVERY_REJECTED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Re-tag an `Internal` failure as coming from a specific collaborator.
    /// Already classified errors pass through unchanged.
    pub fn classify(self, wrap: fn(anyhow::Error) -> Self) -> Self {
        match self {
            Self::Internal(e) => wrap(e),
            other => other,
        }
    }

    fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::SourceUnavailable(e)
            | Self::SuppressionUnavailable(e)
            | Self::LedgerUnavailable(e)
            | Self::QueueUnavailable(e)
            | Self::Internal(e) => Some(e),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidUnsubscribeToken => StatusCode::BAD_REQUEST,
            Self::DeliveryRejected(_) => StatusCode::BAD_GATEWAY,
            Self::SourceUnavailable(_)
            | Self::SuppressionUnavailable(_)
            | Self::LedgerUnavailable(_)
            | Self::QueueUnavailable(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records every status; only server faults need the cause chain.
        if status.is_server_error() {
            let cause = self.cause().map(|e| format!("{e:#}")).unwrap_or_default();
            tracing::error!(error = %self, cause = %cause, kind = self.kind(), "request failed");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
