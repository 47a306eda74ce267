//! Tests for the daily clock window and specific-date filters.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use slot_engine::interval::TimeInterval;
use slot_engine::partition::{AvailableInterval, CalendarPartition};
use slot_engine::window::{clip_to_clock_window, filter_specific_dates};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
}

fn iv(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeInterval {
    TimeInterval::new(start, end)
}

fn clock(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn partition_with(available: Vec<AvailableInterval>) -> CalendarPartition {
    CalendarPartition {
        available,
        ..CalendarPartition::empty(iv(at(16, 0), at(26, 0)))
    }
}

fn spans(partition: &CalendarPartition) -> Vec<TimeInterval> {
    partition.available.iter().map(AvailableInterval::interval).collect()
}

// ── Clock window ────────────────────────────────────────────────────────────

#[test]
fn multi_day_interval_is_cut_to_daily_hours() {
    let partition = partition_with(vec![iv(at(16, 8), at(18, 20)).into()]);

    let clipped = clip_to_clock_window(partition, clock(9), clock(17));

    assert_eq!(
        spans(&clipped),
        vec![iv(at(16, 9), at(16, 17)), iv(at(17, 9), at(17, 17)), iv(at(18, 9), at(18, 17))]
    );
}

#[test]
fn interval_outside_the_window_disappears() {
    let partition = partition_with(vec![iv(at(16, 18), at(16, 20)).into()]);

    let clipped = clip_to_clock_window(partition, clock(9), clock(17));

    assert!(!clipped.has_available());
    assert!(clipped.unavailable.is_empty());
}

#[test]
fn window_ending_before_it_starts_wraps_past_midnight() {
    let partition = partition_with(vec![iv(at(16, 0), at(17, 6)).into()]);

    let clipped = clip_to_clock_window(partition, clock(22), clock(2));

    assert_eq!(
        spans(&clipped),
        vec![iv(at(16, 0), at(16, 2)), iv(at(16, 22), at(17, 2))]
    );
}

#[test]
fn clipping_keeps_duration_annotations() {
    let annotated = AvailableInterval::with_durations(
        iv(at(16, 8), at(16, 12)),
        [30, 60].into_iter().collect(),
    );
    let partition = partition_with(vec![annotated]);

    let clipped = clip_to_clock_window(partition, clock(9), clock(11));

    assert_eq!(clipped.available.len(), 1);
    assert_eq!(clipped.available[0].interval(), iv(at(16, 9), at(16, 11)));
    assert_eq!(clipped.available[0].durations, Some([30, 60].into_iter().collect()));
}

// ── Specific dates ──────────────────────────────────────────────────────────

#[test]
fn only_intervals_on_listed_dates_remain() {
    let partition = partition_with(vec![
        iv(at(16, 9), at(16, 17)).into(),
        iv(at(17, 9), at(17, 17)).into(),
        iv(at(18, 9), at(18, 17)).into(),
    ]);
    let dates = [NaiveDate::from_ymd_opt(2026, 3, 17).unwrap()];

    let filtered = filter_specific_dates(partition, &dates);

    assert_eq!(spans(&filtered), vec![iv(at(17, 9), at(17, 17))]);
}

#[test]
fn every_match_is_kept_including_overnight_intervals() {
    let partition = partition_with(vec![
        iv(at(16, 22), at(17, 2)).into(),
        iv(at(17, 9), at(17, 12)).into(),
        iv(at(17, 14), at(17, 17)).into(),
    ]);
    let dates = [NaiveDate::from_ymd_opt(2026, 3, 17).unwrap()];

    let filtered = filter_specific_dates(partition, &dates);

    assert_eq!(filtered.available.len(), 3);
}

#[test]
fn empty_date_list_keeps_everything() {
    let partition = partition_with(vec![iv(at(16, 9), at(16, 17)).into()]);
    assert_eq!(filter_specific_dates(partition.clone(), &[]), partition);
}
