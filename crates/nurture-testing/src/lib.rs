//! Test utilities for nurture services.
//!
//! Provides cron-trigger credentials and the contract fixture loader.
//! Import from `[dev-dependencies]` only.

pub mod cron;
pub mod fixture;
