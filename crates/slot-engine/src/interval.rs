//! Primitive set operations on time intervals.
//!
//! Every interval is half-open, `[start, end)`. Two intervals that merely touch
//! (one ends exactly when the other starts) do NOT overlap. Every list returned
//! from this module is sorted ascending by `(start, end)`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// A span of absolute UTC time.
///
/// Deserialization rejects inverted bounds, so loaded data never reaches
/// [`TimeInterval::new`] with `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = SlotError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        TimeInterval::try_new(raw.start, raw.end)
    }
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end, "TimeInterval start must not be after end");
        Self { start, end }
    }

    /// Build an interval from caller-supplied bounds, rejecting inverted ones.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(SlotError::InvalidRange(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole minutes covered by the interval (truncating).
    pub fn length_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `true` iff `self.start < other.end && other.start < self.end`.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Closed containment of an instant, `start <= t <= end`.
    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn covers(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The common part of two intervals, `None` when empty or inverted.
    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(TimeInterval { start, end })
        } else {
            None
        }
    }

    /// The parts of `self` not covered by `other`.
    ///
    /// - no overlap: `[self]`
    /// - `other` covers `self`: `[]`
    /// - `other` covers one edge: the remaining side
    /// - `other` strictly interior: the parts before and after it
    pub fn subtract(&self, other: &TimeInterval) -> Vec<TimeInterval> {
        if !self.overlaps(other) {
            return vec![*self];
        }

        let mut parts = Vec::with_capacity(2);
        if self.start < other.start {
            parts.push(TimeInterval {
                start: self.start,
                end: other.start,
            });
        }
        if other.end < self.end {
            parts.push(TimeInterval {
                start: other.end,
                end: self.end,
            });
        }
        parts
    }
}

impl PartialOrd for TimeInterval {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeInterval {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}

/// Sort ascending by start, ties broken by end.
pub fn sort_intervals(intervals: &mut [TimeInterval]) {
    intervals.sort_by_key(|i| (i.start, i.end));
}

/// `true` if the list is sorted by `(start, end)`.
pub fn is_sorted(intervals: &[TimeInterval]) -> bool {
    intervals
        .windows(2)
        .all(|w| (w[0].start, w[0].end) <= (w[1].start, w[1].end))
}

/// Union mutually overlapping intervals.
///
/// Intervals that only touch stay separate, consistent with
/// [`TimeInterval::overlaps`]. The result is sorted and contains no two
/// overlapping entries, so merging it again returns it unchanged.
pub fn merge_overlapping(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut sorted: Vec<TimeInterval> =
        intervals.iter().filter(|i| !i.is_empty()).copied().collect();
    sort_intervals(&mut sorted);

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start < last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Subtract every interval in `to_remove` from every interval in `base`.
///
/// Both inputs may be unsorted; the result is sorted.
pub fn subtract_all(base: &[TimeInterval], to_remove: &[TimeInterval]) -> Vec<TimeInterval> {
    let removals = merge_overlapping(to_remove);
    let mut result: Vec<TimeInterval> = Vec::new();

    for b in base {
        let mut remaining = vec![*b];
        for r in &removals {
            if r.start >= b.end {
                break;
            }
            remaining = remaining.iter().flat_map(|part| part.subtract(r)).collect();
        }
        result.extend(remaining.into_iter().filter(|i| !i.is_empty()));
    }

    sort_intervals(&mut result);
    result
}

/// Intersect every interval in `base` with the union of `mask`.
pub fn intersect_all(base: &[TimeInterval], mask: &[TimeInterval]) -> Vec<TimeInterval> {
    let mask = merge_overlapping(mask);
    let mut result: Vec<TimeInterval> = base
        .iter()
        .flat_map(|b| mask.iter().filter_map(move |m| b.intersect(m)))
        .collect();
    sort_intervals(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
    }

    fn iv(sh: u32, eh: u32) -> TimeInterval {
        TimeInterval::new(at(sh, 0), at(eh, 0))
    }

    #[test]
    fn subtract_no_overlap_returns_self() {
        assert_eq!(iv(9, 10).subtract(&iv(10, 11)), vec![iv(9, 10)]);
    }

    #[test]
    fn subtract_full_cover_returns_nothing() {
        assert!(iv(9, 10).subtract(&iv(8, 11)).is_empty());
        assert!(iv(9, 10).subtract(&iv(9, 10)).is_empty());
    }

    #[test]
    fn subtract_interior_splits() {
        assert_eq!(iv(9, 17).subtract(&iv(12, 13)), vec![iv(9, 12), iv(13, 17)]);
    }

    #[test]
    fn intersect_touching_is_none() {
        assert_eq!(iv(9, 10).intersect(&iv(10, 11)), None);
    }

    #[test]
    fn try_new_rejects_inverted() {
        assert!(TimeInterval::try_new(at(10, 0), at(9, 0)).is_err());
        assert!(TimeInterval::try_new(at(9, 0), at(9, 0)).is_ok());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut list = vec![iv(9, 12), iv(8, 9), iv(9, 10)];
        list.sort();
        assert_eq!(list, vec![iv(8, 9), iv(9, 10), iv(9, 12)]);
    }
}
