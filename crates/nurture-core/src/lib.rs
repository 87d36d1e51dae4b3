//! Service plumbing shared by the nurture binaries: health checks, request ids
//! and tracing setup.

pub mod health;
pub mod middleware;
pub mod tracing;
