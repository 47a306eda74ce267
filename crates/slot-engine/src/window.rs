//! Presentation filters: a daily clock window and an explicit date list.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::interval::TimeInterval;
use crate::partition::{AvailableInterval, CalendarPartition};
use crate::timestamps::start_of_day;

/// Intersect every AVAILABLE interval with the UTC clock window `[from, to)`
/// on each date it touches.
///
/// When `to <= from` the window wraps past midnight into the next day.
/// Clipped-off time is dropped, not marked unavailable.
pub fn clip_to_clock_window(
    mut partition: CalendarPartition,
    from: NaiveTime,
    to: NaiveTime,
) -> CalendarPartition {
    let wraps = to <= from;
    let mut clipped: Vec<AvailableInterval> = Vec::with_capacity(partition.available.len());

    for b in &partition.available {
        let interval = b.interval();
        // A wrapping window opened the previous evening can reach into the first day.
        let mut day = start_of_day(interval.start) - Duration::days(1);
        let last_day = start_of_day(interval.end);

        while day <= last_day {
            let window_start = day.date_naive().and_time(from).and_utc();
            let window_end_day = if wraps { day + Duration::days(1) } else { day };
            let window_end = window_end_day.date_naive().and_time(to).and_utc();

            if let Some(part) = interval.intersect(&TimeInterval::new(window_start, window_end)) {
                clipped.push(b.reshaped(part));
            }
            day += Duration::days(1);
        }
    }

    partition.available = clipped;
    partition.sort();
    partition
}

/// Keep AVAILABLE intervals that start or end on one of `dates` (UTC).
///
/// An empty list keeps everything.
pub fn filter_specific_dates(
    mut partition: CalendarPartition,
    dates: &[NaiveDate],
) -> CalendarPartition {
    if dates.is_empty() {
        return partition;
    }
    partition.available.retain(|b| {
        dates.contains(&b.start.date_naive()) || dates.contains(&b.end.date_naive())
    });
    partition
}
