use chrono::{DateTime, Utc};

use crate::domain::sequence::Sequence;
use crate::domain::types::{AnchoredEntity, LifecycleStatus};
use crate::domain::window::elapsed_days;

/// `Some(Terminal)` when an active entity has outlived its sequence by more than the
/// grace period. Sequences without an expiry policy never expire anything.
///
/// Independent of whether any window matched: an entity whose windows were all
/// missed (scheduler down) still expires.
pub fn maybe_expire(
    entity: &AnchoredEntity,
    now: DateTime<Utc>,
    sequence: &Sequence,
) -> Option<LifecycleStatus> {
    let policy = sequence.expiry()?;
    if entity.status != LifecycleStatus::Active {
        return None;
    }
    let horizon = f64::from(sequence.last_step().day_offset) + policy.grace_days;
    (elapsed_days(entity.anchor_time, now) > horizon).then_some(LifecycleStatus::Terminal)
}
