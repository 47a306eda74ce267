//! Effective query ranges and day-bucketed open windows.
//!
//! Functions here validate caller input and fail fast; everything downstream
//! of them is total.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{RangeEdge, Result, SlotError};
use crate::interval::{sort_intervals, TimeInterval};

/// Last second of a day window: windows run `00:00:00..=23:59:59`.
const DAY_WINDOW_SECONDS: i64 = 86_399;

/// Midnight UTC of the day containing `t`.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// `t + by`, or [`SlotError::InvalidRange`] when either the offset or the
/// sum falls outside chrono's representable range.
fn shift(t: DateTime<Utc>, by: Option<Duration>, what: &str) -> Result<DateTime<Utc>> {
    by.and_then(|d| t.checked_add_signed(d)).ok_or_else(|| {
        SlotError::InvalidRange(format!("{what} is out of the supported date range"))
    })
}

fn day_window(day_start: DateTime<Utc>) -> Result<TimeInterval> {
    let end = shift(day_start, Duration::try_seconds(DAY_WINDOW_SECONDS), "day window")?;
    Ok(TimeInterval::new(day_start, end))
}

/// Compute the effective query range from an event's open windows.
///
/// - No windows: [`SlotError::NoTimestamps`].
/// - Last window already ended: [`SlotError::EventClosed`].
/// - Start in the past: moved to `now + grace` when the first window (or the
///   first later window that is still open) ends after that instant, or to the
///   start of the first window that begins at or after `now`.
/// - Ranges shorter than `minimum_range_days` are extended from the start.
pub fn resolve_range(
    windows: &[TimeInterval],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<TimeInterval> {
    let mut sorted = windows.to_vec();
    sort_intervals(&mut sorted);

    let first = sorted.first().ok_or(SlotError::NoTimestamps)?;
    let mut start = first.start;
    let mut end = sorted.iter().map(|w| w.end).max().unwrap_or(first.end);

    if end < now {
        return Err(SlotError::EventClosed(end));
    }

    if start < now {
        let grace = shift(now, Duration::try_minutes(config.start_grace_minutes), "start grace")?;
        start = if first.end > grace {
            grace
        } else {
            sorted
                .iter()
                .find_map(|w| {
                    if w.start >= now {
                        Some(w.start)
                    } else if w.end > grace {
                        Some(grace)
                    } else {
                        None
                    }
                })
                .unwrap_or(now)
        };
    }

    let floor = shift(start, Duration::try_days(config.minimum_range_days), "minimum range")?;
    if end < floor {
        end = floor;
    }

    Ok(TimeInterval::new(start, end))
}

/// Reject a requested range whose start is after its end.
pub fn validate_requested_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TimeInterval> {
    TimeInterval::try_new(start, end)
}

/// Fit a requester's range inside the event's effective range.
///
/// A past start moves to `now` and an end past the event's end is capped.
/// A range that ends before `now` is invalid; one that ends before the event
/// starts, or starts after it ends, is out of bounds.
pub fn clamp_requested_range(
    requested: TimeInterval,
    event_range: TimeInterval,
    now: DateTime<Utc>,
) -> Result<TimeInterval> {
    let requested = validate_requested_range(requested.start, requested.end)?;

    if requested.end < now {
        return Err(SlotError::InvalidRange(format!(
            "requested range ends at {}, before the current time",
            requested.end.to_rfc3339()
        )));
    }

    let start = requested.start.max(now);
    let end = requested.end.min(event_range.end);

    if end < event_range.start {
        return Err(SlotError::OutOfBounds {
            edge: RangeEdge::End,
            at: requested.end,
        });
    }
    if start > end {
        return Err(SlotError::OutOfBounds {
            edge: RangeEdge::Start,
            at: requested.start,
        });
    }

    Ok(TimeInterval::new(start, end))
}

/// Day windows for a meeting-hub page, starting today for page 1.
///
/// Page `n` starts `page_stride_days * (n - 1)` days after today and covers
/// `page_days` consecutive days. Page 0 is treated as page 1.
///
/// Pages far enough out to leave chrono's date range are
/// [`SlotError::InvalidRange`].
pub fn page_windows(
    page: u32,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<Vec<TimeInterval>> {
    let offset = i64::from(config.page_stride_days).checked_mul(i64::from(page.max(1) - 1));
    let first = shift(start_of_day(now), offset.and_then(Duration::try_days), "page")?;

    (0..i64::from(config.page_days))
        .map(|i| shift(first, Duration::try_days(i), "page").and_then(day_window))
        .collect()
}

/// One window per UTC date touched by `range`, clipped to the range.
pub fn windows_from_range(range: TimeInterval) -> Vec<TimeInterval> {
    let mut windows = Vec::new();
    let mut day = start_of_day(range.start);

    while day <= range.end {
        let start = day.max(range.start);
        let end = day_window(day).map_or(range.end, |w| w.end.min(range.end));
        if start < end {
            windows.push(TimeInterval::new(start, end));
        }
        match day.checked_add_signed(Duration::days(1)) {
            Some(next) => day = next,
            None => break,
        }
    }

    windows
}

/// Why a meeting overlap check passed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapReason {
    WithinOpenWindow,
    EventClosed,
    NotWithinOpenWindow,
    Rejected,
}

/// Outcome of checking a candidate meeting against an event's open windows.
///
/// A failed check is an expected answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapCheck {
    pub status: bool,
    pub reason: OverlapReason,
    pub message: String,
}

impl OverlapCheck {
    fn from_reason(reason: OverlapReason) -> Self {
        let message = match reason {
            OverlapReason::WithinOpenWindow => "Timestamp is overlapped",
            OverlapReason::EventClosed => "This Event is closed",
            OverlapReason::NotWithinOpenWindow => {
                "Meeting startTime and endTime are not overlapping to Event timestamps"
            }
            OverlapReason::Rejected => "Meeting time was rejected",
        };
        Self {
            status: reason == OverlapReason::WithinOpenWindow,
            reason,
            message: message.to_string(),
        }
    }

    /// A failed check carrying an error's message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: false,
            reason: OverlapReason::Rejected,
            message: message.into(),
        }
    }
}

/// Check that a candidate meeting lies entirely inside one open window.
///
/// Inverted candidates, and candidates in the past unless `allow_past`, are
/// rejected with [`SlotError::InvalidRange`]. Containment is inclusive at both
/// window edges.
pub fn check_meeting_overlap(
    windows: &[TimeInterval],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    allow_past: bool,
) -> Result<OverlapCheck> {
    if start > end {
        return Err(SlotError::InvalidRange(
            "end date should be greater than start date".to_string(),
        ));
    }
    if !allow_past && start < now {
        return Err(SlotError::InvalidRange(
            "start date should be greater than current time".to_string(),
        ));
    }
    if !allow_past && end < now {
        return Err(SlotError::InvalidRange(
            "end date should be greater than current time".to_string(),
        ));
    }

    let last_end = windows
        .iter()
        .map(|w| w.end)
        .max()
        .ok_or(SlotError::NoTimestamps)?;
    if last_end < now && !allow_past {
        return Ok(OverlapCheck::from_reason(OverlapReason::EventClosed));
    }

    let inside = windows
        .iter()
        .any(|w| w.contains_instant(start) && w.contains_instant(end));
    Ok(OverlapCheck::from_reason(if inside {
        OverlapReason::WithinOpenWindow
    } else {
        OverlapReason::NotWithinOpenWindow
    }))
}
