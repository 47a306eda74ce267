//! The initial partition built from an event's open windows.

use chrono::{DateTime, NaiveDate, Utc};

use crate::interval::{merge_overlapping, TimeInterval};
use crate::partition::{AvailableInterval, CalendarPartition};

/// Build the starting partition for `query` from the event's open windows.
///
/// Each window overlapping the query contributes `[max(query.start, w.start),
/// w.end]`. Only the start side is clipped; the query end is the caller's
/// concern. When `allowed_dates` is given, a window is kept only if the UTC
/// date of its clipped start is listed. Overlapping windows are coalesced so
/// the result satisfies the partition invariant.
pub fn build(
    query: TimeInterval,
    windows: &[TimeInterval],
    allowed_dates: Option<&[NaiveDate]>,
) -> CalendarPartition {
    let opened: Vec<TimeInterval> = windows
        .iter()
        .filter(|w| w.overlaps(&query))
        .map(|w| TimeInterval::new(query.start.max(w.start), w.end))
        .filter(|w| match allowed_dates {
            Some(dates) if !dates.is_empty() => dates.contains(&w.start.date_naive()),
            _ => true,
        })
        .collect();

    CalendarPartition {
        available: merge_overlapping(&opened)
            .into_iter()
            .map(AvailableInterval::from)
            .collect(),
        ..CalendarPartition::empty(query)
    }
}

/// Block the whole query: drop every AVAILABLE interval and mark each window
/// that starts at or after `now` UNAVAILABLE.
pub fn mark_all_unavailable(
    mut partition: CalendarPartition,
    windows: &[TimeInterval],
    now: DateTime<Utc>,
) -> CalendarPartition {
    partition.available.clear();
    partition
        .unavailable
        .extend(windows.iter().filter(|w| w.start >= now).copied());
    partition.unavailable = merge_overlapping(&partition.unavailable);
    partition
}
