use chrono::{DateTime, Utc};

use crate::domain::types::OffsetStep;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `anchor` to `now`; negative when the anchor is in the future.
pub fn elapsed_days(anchor: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - anchor).num_milliseconds() as f64 / MS_PER_DAY
}

/// The step whose window contains `now`, if any.
///
/// `steps` must come from a validated [`Sequence`](crate::domain::sequence::Sequence),
/// whose non-overlapping windows guarantee at most one match.
pub fn evaluate(
    anchor: DateTime<Utc>,
    now: DateTime<Utc>,
    steps: &[OffsetStep],
) -> Option<&OffsetStep> {
    if now < anchor {
        return None;
    }
    let elapsed = elapsed_days(anchor, now);
    steps
        .iter()
        .find(|step| (elapsed - f64::from(step.day_offset)).abs() <= step.tolerance_days)
}
