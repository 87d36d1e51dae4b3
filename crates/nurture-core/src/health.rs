use axum::http::StatusCode;

/// `GET /healthz`: liveness check.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map a readiness check result to a status code.
///
/// Services run their own dependency checks (database ping, ...) and hand the
/// outcome here so every `/readyz` reports failures the same way.
pub fn readiness<E: std::fmt::Display>(check: Result<(), E>) -> StatusCode {
    match check {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            ::tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
