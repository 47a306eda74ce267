//! Meeting-duration granularities that tile an interval.

use std::collections::BTreeSet;

use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;

/// Durations are declared in whole minutes and must be multiples of this.
pub const DURATION_STEP_MINUTES: u32 = 15;

/// Ordered set of durations in minutes.
pub type DurationSet = BTreeSet<u32>;

/// Durations from `candidates` that evenly tile a span of `length_seconds`.
///
/// A candidate `d` qualifies when the span is at least `d` minutes long and
/// divides into `d`-minute blocks with no remainder. When `exact` is given the
/// result contains at most that one value.
pub fn tiling_durations(
    length_seconds: i64,
    candidates: &[u32],
    exact: Option<u32>,
) -> DurationSet {
    candidates
        .iter()
        .copied()
        .filter(|&d| d > 0)
        .filter(|&d| {
            let block = i64::from(d) * 60;
            length_seconds >= block && length_seconds % block == 0
        })
        .filter(|&d| exact.is_none_or(|e| e == d))
        .collect()
}

/// Durations from `candidates` that evenly tile `interval`.
pub fn viable_durations(
    interval: &TimeInterval,
    candidates: &[u32],
    exact: Option<u32>,
) -> DurationSet {
    tiling_durations(interval.duration().num_seconds(), candidates, exact)
}

/// Reject zero durations and durations that are not multiples of 15 minutes.
pub fn validate_durations(durations: &[u32]) -> Result<()> {
    match durations
        .iter()
        .find(|&&d| d == 0 || d % DURATION_STEP_MINUTES != 0)
    {
        Some(&bad) => Err(SlotError::InvalidDuration(bad)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_candidate_is_ignored() {
        assert!(tiling_durations(3600, &[0], None).is_empty());
    }

    #[test]
    fn exact_filter_keeps_only_requested() {
        let set = tiling_durations(3600, &[15, 30, 60], Some(30));
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![30]);
    }

    #[test]
    fn validate_rejects_non_multiples() {
        assert!(validate_durations(&[15, 30, 45]).is_ok());
        assert!(matches!(validate_durations(&[15, 20]), Err(SlotError::InvalidDuration(20))));
        assert!(matches!(validate_durations(&[0]), Err(SlotError::InvalidDuration(0))));
    }
}
