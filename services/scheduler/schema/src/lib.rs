//! sea-orm entities for the scheduler database.

pub mod events;
pub mod leads;
pub mod message_templates;
pub mod notification_ledger;
pub mod notifications;
pub mod suppressions;
