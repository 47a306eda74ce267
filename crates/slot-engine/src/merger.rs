//! Fold reduced recurring slots onto an absolute-date partition.

use std::collections::VecDeque;

use chrono::{Datelike, Duration};

use crate::duration::viable_durations;
use crate::interval::TimeInterval;
use crate::partition::{AvailableInterval, CalendarPartition};
use crate::recurring::ResolvedSlot;
use crate::timestamps::start_of_day;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Move AVAILABLE time no slot can use into UNAVAILABLE instead of dropping it.
    pub include_unavailable: bool,
    /// Annotate output intervals with durations, and require at least one.
    pub want_durations: bool,
    /// Only this duration counts as viable.
    pub exact_duration: Option<u32>,
}

/// Concrete occurrences of `slots` that could touch `interval`, earliest first.
///
/// Starts a day early so slots spilling over midnight are included.
fn occurrences<'a>(
    interval: &TimeInterval,
    slots: &'a [ResolvedSlot],
) -> Vec<(TimeInterval, &'a ResolvedSlot)> {
    let mut found = Vec::new();
    let mut day = start_of_day(interval.start) - Duration::days(1);
    let last_day = start_of_day(interval.end);

    while day <= last_day {
        let date = day.date_naive();
        found.extend(
            slots
                .iter()
                .filter(|s| s.day == date.weekday())
                .map(|s| (s.occurrence_on(date), s)),
        );
        day += Duration::days(1);
    }

    found.sort_by_key(|(occ, _)| (occ.start, occ.end));
    found
}

/// Restrict AVAILABLE time to the reduced recurring slots.
///
/// Works through a queue of available intervals. For each one, the earliest
/// productive slot occurrence (one whose overlap has a viable duration, or any
/// overlap when durations are not wanted) yields an output interval, and the
/// parts of the interval outside that occurrence go back on the queue. An
/// interval with no productive occurrence is dropped, or moved to UNAVAILABLE
/// when `include_unavailable` is set.
pub fn merge(
    partition: CalendarPartition,
    slots: &[ResolvedSlot],
    options: MergeOptions,
) -> CalendarPartition {
    let CalendarPartition {
        query_start,
        query_end,
        available,
        mut unavailable,
    } = partition;

    let mut queue: VecDeque<AvailableInterval> = available.into();
    let mut merged: Vec<AvailableInterval> = Vec::new();

    while let Some(candidate) = queue.pop_front() {
        let interval = candidate.interval();

        let productive = occurrences(&interval, slots)
            .into_iter()
            .find_map(|(occurrence, slot)| {
                let overlap = interval.intersect(&occurrence)?;
                let candidates: Vec<u32> = slot.durations.iter().copied().collect();
                let durations = viable_durations(&overlap, &candidates, options.exact_duration);
                if options.want_durations && durations.is_empty() {
                    return None;
                }
                Some((occurrence, overlap, durations))
            });

        match productive {
            Some((occurrence, overlap, durations)) => {
                merged.push(if options.want_durations {
                    AvailableInterval::with_durations(overlap, durations)
                } else {
                    AvailableInterval::from(overlap)
                });
                queue.extend(
                    interval
                        .subtract(&occurrence)
                        .into_iter()
                        .map(|rest| candidate.reshaped(rest)),
                );
            }
            None => {
                if options.include_unavailable && !interval.is_empty() {
                    unavailable.push(interval);
                }
            }
        }
    }

    let mut result = CalendarPartition {
        query_start,
        query_end,
        available: merged,
        unavailable,
    };
    result.sort();
    result
}
