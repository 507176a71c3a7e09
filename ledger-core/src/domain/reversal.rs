//! Reversal eligibility

use chrono::{DateTime, Utc};

use super::Movement;

/// Whether `movement` may still be reversed at `now`
///
/// True iff the movement has not been reversed yet and `now` is not past its
/// reversal deadline. Raising `MovementNotReversible` is up to the caller.
pub fn is_reversible(movement: &Movement, now: DateTime<Utc>) -> bool {
    movement.is_reversible && now <= movement.reversal_deadline
}
