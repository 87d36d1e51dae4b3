//! Offset tables and their validation.
//!
//! A bad table would let two steps match in the same cycle, so every rule here is
//! checked once at startup and the process refuses to run otherwise.

use std::collections::HashSet;

use crate::domain::types::{AnchorKind, ExpiryPolicy, OffsetStep};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequenceError {
    #[error("{kind} sequence has no steps")]
    Empty { kind: AnchorKind },
    #[error("{kind} sequence has an empty category")]
    EmptyCategory { kind: AnchorKind },
    #[error("{kind} sequence: day offset {day_offset} is not strictly after the previous step")]
    NotAscending { kind: AnchorKind, day_offset: u32 },
    #[error("{kind} sequence: step {render_key} has an empty or invalid tolerance")]
    InvalidTolerance { kind: AnchorKind, render_key: String },
    #[error(
        "{kind} sequence: step {render_key} tolerance {tolerance_days} is not below half the {gap_days}-day gap to its neighbour"
    )]
    WindowOverlap {
        kind: AnchorKind,
        render_key: String,
        tolerance_days: f64,
        gap_days: u32,
    },
    #[error("{kind} sequence has a step with an empty render key")]
    EmptyRenderKey { kind: AnchorKind },
    #[error("render key {render_key} appears more than once")]
    DuplicateRenderKey { render_key: String },
    #[error("{kind} sequence: expiry grace must be a finite, non-negative number of days")]
    InvalidGrace { kind: AnchorKind },
    #[error("sequence for {kind} configured where {expected} was expected")]
    WrongKind {
        kind: AnchorKind,
        expected: AnchorKind,
    },
}

/// Ordered offset steps for one anchor kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    kind: AnchorKind,
    category: String,
    steps: Vec<OffsetStep>,
    expiry: Option<ExpiryPolicy>,
}

impl Sequence {
    pub fn new(
        kind: AnchorKind,
        category: impl Into<String>,
        steps: Vec<OffsetStep>,
        expiry: Option<ExpiryPolicy>,
    ) -> Result<Self, SequenceError> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(SequenceError::EmptyCategory { kind });
        }
        if steps.is_empty() {
            return Err(SequenceError::Empty { kind });
        }
        if let Some(policy) = expiry {
            if !policy.grace_days.is_finite() || policy.grace_days < 0.0 {
                return Err(SequenceError::InvalidGrace { kind });
            }
        }

        let mut keys = HashSet::new();
        for (i, step) in steps.iter().enumerate() {
            if step.render_key.trim().is_empty() {
                return Err(SequenceError::EmptyRenderKey { kind });
            }
            if !keys.insert(step.render_key.as_str()) {
                return Err(SequenceError::DuplicateRenderKey {
                    render_key: step.render_key.clone(),
                });
            }
            if !step.tolerance_days.is_finite() || step.tolerance_days < 0.0 {
                return Err(SequenceError::InvalidTolerance {
                    kind,
                    render_key: step.render_key.clone(),
                });
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &steps[p]) {
                if step.day_offset <= prev.day_offset {
                    return Err(SequenceError::NotAscending {
                        kind,
                        day_offset: step.day_offset,
                    });
                }
            }
        }

        // Offsets are strictly ascending from here on.
        for (i, step) in steps.iter().enumerate() {
            let before = i
                .checked_sub(1)
                .map(|p| step.day_offset - steps[p].day_offset);
            let after = steps.get(i + 1).map(|next| next.day_offset - step.day_offset);
            let nearest = match (before, after) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            if let Some(gap_days) = nearest {
                if step.tolerance_days >= f64::from(gap_days) / 2.0 {
                    return Err(SequenceError::WindowOverlap {
                        kind,
                        render_key: step.render_key.clone(),
                        tolerance_days: step.tolerance_days,
                        gap_days,
                    });
                }
            }
        }

        Ok(Self {
            kind,
            category,
            steps,
            expiry,
        })
    }

    pub fn kind(&self) -> AnchorKind {
        self.kind
    }

    /// Suppression category checked before enqueueing any step of this sequence.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn steps(&self) -> &[OffsetStep] {
        &self.steps
    }

    pub fn expiry(&self) -> Option<ExpiryPolicy> {
        self.expiry
    }

    /// Last step, non-empty by construction.
    pub fn last_step(&self) -> &OffsetStep {
        &self.steps[self.steps.len() - 1]
    }

    /// How far back an anchor can lie and still have a step (or an expiry) ahead of it.
    pub fn horizon_days(&self) -> f64 {
        let last = self.last_step();
        let grace = self.expiry.map_or(0.0, |p| p.grace_days);
        f64::from(last.day_offset) + last.tolerance_days + grace
    }
}

/// Both sequences, validated together.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerPlan {
    leads: Sequence,
    events: Sequence,
}

impl SchedulerPlan {
    pub fn new(leads: Sequence, events: Sequence) -> Result<Self, SequenceError> {
        for (sequence, expected) in [(&leads, AnchorKind::Lead), (&events, AnchorKind::Event)] {
            if sequence.kind() != expected {
                return Err(SequenceError::WrongKind {
                    kind: sequence.kind(),
                    expected,
                });
            }
        }
        let lead_keys: HashSet<&str> = leads.steps.iter().map(|s| s.render_key.as_str()).collect();
        if let Some(shared) = events
            .steps
            .iter()
            .find(|s| lead_keys.contains(s.render_key.as_str()))
        {
            return Err(SequenceError::DuplicateRenderKey {
                render_key: shared.render_key.clone(),
            });
        }
        Ok(Self { leads, events })
    }

    pub fn leads(&self) -> &Sequence {
        &self.leads
    }

    pub fn events(&self) -> &Sequence {
        &self.events
    }
}

pub const LEAD_CATEGORY: &str = "lead_nurturing";
pub const EVENT_CATEGORY: &str = "post_event";
pub const DEFAULT_TOLERANCE_DAYS: f64 = 0.5;

/// Lead nurturing: follow-up, promo, last chance.
pub fn default_lead_steps() -> Vec<OffsetStep> {
    vec![
        OffsetStep::new(1, "B2C_LEAD_FOLLOWUP", DEFAULT_TOLERANCE_DAYS),
        OffsetStep::new(3, "B2C_PROMO_72H", DEFAULT_TOLERANCE_DAYS),
        OffsetStep::new(7, "B2C_PROMO_LAST_CHANCE", DEFAULT_TOLERANCE_DAYS),
    ]
}

/// Post-event: review request, review reminder, anniversary.
pub fn default_event_steps() -> Vec<OffsetStep> {
    vec![
        OffsetStep::new(1, "B2C_AVIS_GOOGLE", DEFAULT_TOLERANCE_DAYS),
        OffsetStep::new(7, "B2C_RELANCE_AVIS", DEFAULT_TOLERANCE_DAYS),
        OffsetStep::new(365, "B2C_EVENT_ANNIVERSARY", DEFAULT_TOLERANCE_DAYS),
    ]
}
