//! Shared-secret guard for the cron endpoints.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SchedulerError;

pub const X_CRON_SECRET: &str = "x-cron-secret";

/// The secret the platform scheduler presents.
#[derive(Clone)]
pub struct CronSecret(pub Arc<str>);

impl CronSecret {
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    /// Compares in constant time: both sides go through an HMAC keyed by the
    /// secret, so neither prefix nor length shows up in the timing.
    pub fn matches(&self, presented: &str) -> bool {
        let tag = |value: &str| {
            Hmac::<Sha256>::new_from_slice(self.0.as_bytes()).map(|mut mac| {
                mac.update(value.as_bytes());
                mac
            })
        };
        match (tag(&self.0[..]), tag(presented)) {
            (Ok(expected), Ok(candidate)) => candidate
                .verify_slice(&expected.finalize().into_bytes())
                .is_ok(),
            _ => false,
        }
    }
}

/// Proof that the request carried the cron secret, either as
/// `Authorization: Bearer <secret>` or as `x-cron-secret: <secret>`.
///
/// Rejects with 401 before the handler body runs.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl<S> FromRequestParts<S> for CronAuth
where
    CronSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SchedulerError;

    // Headers are read synchronously so the returned future borrows nothing.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let expected = CronSecret::from_ref(state);
        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_owned());
        let header = parts
            .headers
            .get(X_CRON_SECRET)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let authorized = [bearer, header]
            .into_iter()
            .flatten()
            .any(|presented| expected.matches(&presented));

        async move {
            if authorized {
                Ok(Self)
            } else {
                Err(SchedulerError::Unauthorized)
            }
        }
    }
}
