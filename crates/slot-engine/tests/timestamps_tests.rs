//! Tests for effective query ranges, day windows and meeting overlap checks.

use chrono::{DateTime, Duration, TimeZone, Utc};
use slot_engine::config::EngineConfig;
use slot_engine::error::RangeEdge;
use slot_engine::interval::TimeInterval;
use slot_engine::timestamps::{
    check_meeting_overlap, clamp_requested_range, page_windows, resolve_range,
    validate_requested_range, windows_from_range, OverlapReason,
};
use slot_engine::SlotError;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
}

fn iv(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeInterval {
    TimeInterval::new(start, end)
}

fn now() -> DateTime<Utc> {
    at(16, 10, 0)
}

fn end_of_day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, 23, 59, 59).unwrap()
}

// ── resolve_range ───────────────────────────────────────────────────────────

#[test]
fn future_event_starts_at_first_window_and_spans_minimum_days() {
    let windows = [iv(at(21, 9, 0), at(21, 17, 0)), iv(at(20, 9, 0), at(20, 17, 0))];

    let range = resolve_range(&windows, now(), &EngineConfig::default()).unwrap();

    assert_eq!(range, iv(at(20, 9, 0), at(30, 9, 0)));
}

#[test]
fn ongoing_window_starts_after_grace_period() {
    let windows = [iv(at(16, 8, 0), at(16, 18, 0)), iv(at(17, 8, 0), at(17, 18, 0))];

    let range = resolve_range(&windows, now(), &EngineConfig::default()).unwrap();

    assert_eq!(range.start, at(16, 10, 5));
    assert_eq!(range.end, at(26, 10, 5));
}

#[test]
fn finished_first_window_skips_to_next_upcoming_window() {
    let windows = [iv(at(15, 8, 0), at(15, 18, 0)), iv(at(17, 8, 0), at(17, 18, 0))];

    let range = resolve_range(&windows, now(), &EngineConfig::default()).unwrap();

    assert_eq!(range.start, at(17, 8, 0));
}

#[test]
fn long_events_keep_their_own_end() {
    let last = Utc.with_ymd_and_hms(2026, 4, 30, 17, 0, 0).unwrap();
    let windows = [iv(at(20, 9, 0), at(20, 17, 0)), iv(last - Duration::hours(8), last)];

    let range = resolve_range(&windows, now(), &EngineConfig::default()).unwrap();

    assert_eq!(range, iv(at(20, 9, 0), last));
}

#[test]
fn grace_and_minimum_come_from_config() {
    let config = EngineConfig {
        start_grace_minutes: 30,
        minimum_range_days: 2,
        ..EngineConfig::default()
    };
    let windows = [iv(at(16, 8, 0), at(16, 18, 0))];

    let range = resolve_range(&windows, now(), &config).unwrap();

    assert_eq!(range, iv(at(16, 10, 30), at(18, 10, 30)));
}

#[test]
fn unvalidated_oversized_config_is_an_error() {
    let windows = [iv(at(16, 8, 0), at(16, 18, 0))];
    for config in [
        EngineConfig {
            start_grace_minutes: i64::MAX,
            ..EngineConfig::default()
        },
        EngineConfig {
            minimum_range_days: i64::MAX,
            ..EngineConfig::default()
        },
    ] {
        let result = resolve_range(&windows, now(), &config);
        assert!(matches!(result, Err(SlotError::InvalidRange(_))));
    }
}

#[test]
fn event_whose_windows_have_all_ended_is_closed() {
    let windows = [iv(at(10, 9, 0), at(10, 17, 0))];

    let result = resolve_range(&windows, now(), &EngineConfig::default());

    assert!(matches!(result, Err(SlotError::EventClosed(end)) if end == at(10, 17, 0)));
}

#[test]
fn event_without_windows_is_an_error() {
    let result = resolve_range(&[], now(), &EngineConfig::default());
    assert!(matches!(result, Err(SlotError::NoTimestamps)));
}

// ── Requested ranges ────────────────────────────────────────────────────────

#[test]
fn inverted_requested_range_is_rejected() {
    let result = validate_requested_range(at(18, 0, 0), at(17, 0, 0));
    assert!(matches!(result, Err(SlotError::InvalidRange(_))));
}

#[test]
fn requested_range_is_fitted_inside_event_range() {
    let event = iv(at(16, 10, 5), at(26, 10, 5));

    let clamped = clamp_requested_range(iv(at(15, 0, 0), at(28, 0, 0)), event, now()).unwrap();

    assert_eq!(clamped, iv(now(), at(26, 10, 5)));
}

#[test]
fn requested_range_in_the_past_is_invalid() {
    let event = iv(at(16, 10, 5), at(26, 10, 5));

    let result = clamp_requested_range(iv(at(10, 0, 0), at(12, 0, 0)), event, now());

    assert!(matches!(result, Err(SlotError::InvalidRange(_))));
}

#[test]
fn requested_range_before_event_is_out_of_bounds_at_the_end() {
    let event = iv(at(20, 9, 0), at(30, 9, 0));

    let result = clamp_requested_range(iv(at(17, 0, 0), at(18, 0, 0)), event, now());

    assert!(matches!(
        result,
        Err(SlotError::OutOfBounds { edge: RangeEdge::End, .. })
    ));
}

#[test]
fn requested_range_after_event_is_out_of_bounds_at_the_start() {
    let event = iv(at(20, 9, 0), at(30, 9, 0));
    let requested = iv(
        Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 4, 6, 0, 0, 0).unwrap(),
    );

    let result = clamp_requested_range(requested, event, now());

    assert!(matches!(
        result,
        Err(SlotError::OutOfBounds { edge: RangeEdge::Start, .. })
    ));
}

// ── Day windows ─────────────────────────────────────────────────────────────

#[test]
fn first_page_covers_eight_days_from_today() {
    let windows = page_windows(1, now(), &EngineConfig::default()).unwrap();

    assert_eq!(windows.len(), 8);
    assert_eq!(windows[0], iv(at(16, 0, 0), end_of_day(16)));
    assert_eq!(windows[7], iv(at(23, 0, 0), end_of_day(23)));
}

#[test]
fn later_pages_advance_by_the_stride() {
    let windows = page_windows(2, now(), &EngineConfig::default()).unwrap();
    assert_eq!(windows[0].start, at(23, 0, 0));
}

#[test]
fn page_zero_is_the_first_page() {
    let config = EngineConfig::default();
    assert_eq!(
        page_windows(0, now(), &config).unwrap(),
        page_windows(1, now(), &config).unwrap()
    );
}

#[test]
fn page_beyond_the_calendar_is_invalid() {
    let result = page_windows(u32::MAX, now(), &EngineConfig::default());
    assert!(matches!(result, Err(SlotError::InvalidRange(_))));
}

#[test]
fn page_stride_overflow_is_invalid() {
    let config = EngineConfig {
        page_stride_days: u32::MAX,
        ..EngineConfig::default()
    };
    let result = page_windows(u32::MAX, now(), &config);
    assert!(matches!(result, Err(SlotError::InvalidRange(_))));
}

#[test]
fn range_windows_follow_utc_dates() {
    let windows = windows_from_range(iv(at(16, 10, 0), at(18, 12, 0)));

    assert_eq!(
        windows,
        vec![
            iv(at(16, 10, 0), end_of_day(16)),
            iv(at(17, 0, 0), end_of_day(17)),
            iv(at(18, 0, 0), at(18, 12, 0)),
        ]
    );
}

#[test]
fn range_ending_at_midnight_adds_no_empty_window() {
    let windows = windows_from_range(iv(at(16, 10, 0), at(18, 0, 0)));
    assert_eq!(windows.len(), 2);
}

// ── Meeting overlap checks ──────────────────────────────────────────────────

fn event_windows() -> Vec<TimeInterval> {
    vec![iv(at(20, 9, 0), at(20, 17, 0)), iv(at(21, 9, 0), at(21, 17, 0))]
}

#[test]
fn meeting_inside_a_window_passes() {
    let check =
        check_meeting_overlap(&event_windows(), at(20, 10, 0), at(20, 11, 0), now(), false)
            .unwrap();

    assert!(check.status);
    assert_eq!(check.reason, OverlapReason::WithinOpenWindow);
}

#[test]
fn window_edges_are_inclusive() {
    let check =
        check_meeting_overlap(&event_windows(), at(21, 9, 0), at(21, 17, 0), now(), false)
            .unwrap();
    assert!(check.status);
}

#[test]
fn meeting_straddling_a_window_edge_fails() {
    let check =
        check_meeting_overlap(&event_windows(), at(20, 16, 30), at(20, 17, 30), now(), false)
            .unwrap();

    assert!(!check.status);
    assert_eq!(check.reason, OverlapReason::NotWithinOpenWindow);
}

#[test]
fn meeting_spanning_two_windows_fails() {
    let check =
        check_meeting_overlap(&event_windows(), at(20, 16, 0), at(21, 10, 0), now(), false)
            .unwrap();
    assert!(!check.status);
}

#[test]
fn inverted_or_past_meetings_are_errors() {
    let inverted =
        check_meeting_overlap(&event_windows(), at(20, 11, 0), at(20, 10, 0), now(), false);
    assert!(matches!(inverted, Err(SlotError::InvalidRange(_))));

    let past = check_meeting_overlap(&event_windows(), at(15, 10, 0), at(15, 11, 0), now(), false);
    assert!(matches!(past, Err(SlotError::InvalidRange(_))));
}

#[test]
fn past_meetings_are_checked_when_allowed() {
    let windows = [iv(at(10, 9, 0), at(10, 17, 0))];

    let check = check_meeting_overlap(&windows, at(10, 10, 0), at(10, 11, 0), now(), true).unwrap();

    assert!(check.status);
}

#[test]
fn closed_event_fails_with_closed_reason() {
    let windows = [iv(at(10, 9, 0), at(10, 17, 0))];

    let check =
        check_meeting_overlap(&windows, at(20, 10, 0), at(20, 11, 0), now(), false).unwrap();

    assert!(!check.status);
    assert_eq!(check.reason, OverlapReason::EventClosed);
    assert_eq!(check.message, "This Event is closed");
}
