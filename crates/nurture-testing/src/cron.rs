//! Cron trigger credentials for HTTP tests.
//!
//! The platform scheduler calls the cron endpoints with a shared secret, either as
//! `Authorization: Bearer <secret>` or as `x-cron-secret: <secret>`. `CronCaller`
//! builds both forms so tests never hand-format header values.

use axum::http::{HeaderMap, HeaderName, HeaderValue, header::AUTHORIZATION};

pub const TEST_CRON_SECRET: &str = "test-cron-secret-for-unit-tests-only";

/// Configurable caller presenting a shared secret.
pub struct CronCaller {
    pub secret: String,
}

impl CronCaller {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Caller holding [`TEST_CRON_SECRET`].
    pub fn trusted() -> Self {
        Self::new(TEST_CRON_SECRET)
    }

    /// `Authorization: Bearer <secret>` as sent by the platform cron.
    pub fn bearer_headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.secret)).unwrap(),
        );
        map
    }

    /// `x-cron-secret: <secret>` as sent by manual triggers.
    pub fn secret_headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static("x-cron-secret"),
            HeaderValue::from_str(&self.secret).unwrap(),
        );
        map
    }
}
