//! Recurring weekly availability: expansion, UTC normalization, and reduction
//! across participants.
//!
//! Slots are placed on a UTC week timeline measured in minutes from Monday
//! 00:00. A slot shifted across midnight by its owner's offset moves to the
//! neighbouring weekday, and a slot may spill past midnight into the next day.
//! Intersections are computed on that circular timeline, so same-weekday slots
//! intersect exactly as they would on a single day.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{hhmm, minute_of_day, MINUTES_PER_DAY};
use crate::config::EngineConfig;
use crate::duration::{tiling_durations, validate_durations, DurationSet};
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;

pub const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

/// Largest accepted numeric timezone offset, in minutes either way.
pub const MAX_OFFSET_MINUTES: i32 = 1440;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The day a recurring slot applies to: one weekday or a synthetic group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DaySpec {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    EveryDay,
    WeekDays,
    WeekEnds,
}

impl DaySpec {
    /// The real weekdays this token stands for.
    pub fn weekdays(self) -> &'static [Weekday] {
        match self {
            DaySpec::Monday => &WEEK[0..1],
            DaySpec::Tuesday => &WEEK[1..2],
            DaySpec::Wednesday => &WEEK[2..3],
            DaySpec::Thursday => &WEEK[3..4],
            DaySpec::Friday => &WEEK[4..5],
            DaySpec::Saturday => &WEEK[5..6],
            DaySpec::Sunday => &WEEK[6..7],
            DaySpec::EveryDay => &WEEK,
            DaySpec::WeekDays => &WEEK[0..5],
            DaySpec::WeekEnds => &WEEK[5..7],
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, DaySpec::EveryDay | DaySpec::WeekDays | DaySpec::WeekEnds)
    }

    pub fn from_weekday(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DaySpec::Monday,
            Weekday::Tue => DaySpec::Tuesday,
            Weekday::Wed => DaySpec::Wednesday,
            Weekday::Thu => DaySpec::Thursday,
            Weekday::Fri => DaySpec::Friday,
            Weekday::Sat => DaySpec::Saturday,
            Weekday::Sun => DaySpec::Sunday,
        }
    }
}

/// A weekly availability pattern in the owner's local clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSlot {
    pub day: DaySpec,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    /// Overrides the profile's durations when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub durations: Vec<u32>,
}

impl RecurringSlot {
    fn length_minutes(&self) -> i64 {
        minute_of_day(self.end) - minute_of_day(self.start)
    }
}

/// A participant's declared weekly availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAvailabilityProfile {
    pub contact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub primary: bool,
    /// Minutes east of UTC.
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    /// IANA zone; when set it takes precedence over the numeric offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_name: Option<String>,
    #[serde(default)]
    pub durations: Vec<u32>,
    #[serde(default)]
    pub slots: Vec<RecurringSlot>,
}

impl UserAvailabilityProfile {
    /// Offset from UTC in minutes at `reference`.
    ///
    /// A named zone is resolved at that instant, so DST is honoured for the
    /// week being queried.
    pub fn offset_minutes_at(&self, reference: DateTime<Utc>) -> Result<i64> {
        match &self.timezone_name {
            Some(name) => {
                let tz: chrono_tz::Tz = name
                    .parse()
                    .map_err(|_| SlotError::InvalidTimezone(name.clone()))?;
                let offset = tz.offset_from_utc_datetime(&reference.naive_utc()).fix();
                Ok(i64::from(offset.local_minus_utc()) / 60)
            }
            None => Ok(i64::from(self.timezone_offset_minutes)),
        }
    }

    /// Check the profile the way the persistence layer would before storing it.
    ///
    /// Rejects out-of-range offsets, unknown zone names, durations that are not
    /// multiples of 15, slots that do not end after they start, and slots on
    /// the same day token that overlap or touch.
    pub fn validate(&self) -> Result<()> {
        if self.timezone_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(SlotError::InvalidTimezone(format!(
                "offset {} minutes is outside ±{}",
                self.timezone_offset_minutes, MAX_OFFSET_MINUTES
            )));
        }
        if let Some(name) = &self.timezone_name {
            name.parse::<chrono_tz::Tz>()
                .map_err(|_| SlotError::InvalidTimezone(name.clone()))?;
        }
        validate_durations(&self.durations)?;

        for (i, slot) in self.slots.iter().enumerate() {
            validate_durations(&slot.durations)?;
            if slot.start >= slot.end {
                return Err(SlotError::InvalidTimeSlot(format!(
                    "{:?} slot must end after it starts",
                    slot.day
                )));
            }
            let clash = self.slots[i + 1..].iter().find(|other| {
                other.day == slot.day && slot.start <= other.end && other.start <= slot.end
            });
            if let Some(other) = clash {
                return Err(SlotError::InvalidTimeSlot(format!(
                    "{:?} slots overlap: {}-{} and {}-{}",
                    slot.day,
                    crate::clock::format_clock(slot.start),
                    crate::clock::format_clock(slot.end),
                    crate::clock::format_clock(other.start),
                    crate::clock::format_clock(other.end),
                )));
            }
        }
        Ok(())
    }

    fn candidate_durations<'a>(
        &'a self,
        slot: &'a RecurringSlot,
        config: &'a EngineConfig,
    ) -> &'a [u32] {
        if !slot.durations.is_empty() {
            &slot.durations
        } else if !self.durations.is_empty() {
            &self.durations
        } else {
            &config.default_durations
        }
    }
}

/// A recurring slot on the UTC week timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    /// UTC weekday on which the slot starts.
    pub day: Weekday,
    /// Minutes after UTC midnight, `0..1440`.
    pub start_minute: i64,
    /// Minutes after UTC midnight of `day`; above 1440 when the slot spills
    /// into the next day.
    pub end_minute: i64,
    pub durations: DurationSet,
}

impl ResolvedSlot {
    fn from_week_span(week_start: i64, length: i64, durations: DurationSet) -> Self {
        let start = week_start.rem_euclid(MINUTES_PER_WEEK);
        let day_index = (start / MINUTES_PER_DAY) as usize;
        let start_minute = start % MINUTES_PER_DAY;
        Self {
            day: WEEK[day_index],
            start_minute,
            end_minute: start_minute + length,
            durations,
        }
    }

    /// Minutes from Monday 00:00 UTC to the slot start.
    pub fn week_start(&self) -> i64 {
        i64::from(self.day.num_days_from_monday()) * MINUTES_PER_DAY + self.start_minute
    }

    pub fn length_minutes(&self) -> i64 {
        self.end_minute - self.start_minute
    }

    fn week_end(&self) -> i64 {
        self.week_start() + self.length_minutes()
    }

    fn duration_list(&self) -> Vec<u32> {
        self.durations.iter().copied().collect()
    }

    /// The absolute interval of this slot on `date`, which must be a `day`.
    pub fn occurrence_on(&self, date: NaiveDate) -> TimeInterval {
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        TimeInterval::new(
            midnight + Duration::minutes(self.start_minute),
            midnight + Duration::minutes(self.end_minute),
        )
    }
}

/// Replace synthetic day tokens with one slot per real weekday they cover.
///
/// The result holds only concrete-day slots, in declaration order.
pub fn expand_slots(slots: &[RecurringSlot]) -> Vec<RecurringSlot> {
    slots
        .iter()
        .flat_map(|slot| {
            slot.day.weekdays().iter().map(move |&day| RecurringSlot {
                day: DaySpec::from_weekday(day),
                ..slot.clone()
            })
        })
        .collect()
}

/// Expand a profile's slots and move them onto the UTC week timeline.
///
/// Each slot keeps the durations that tile it exactly; slots with none are
/// dropped since no meeting could ever be placed in them.
pub fn normalize_profile(
    profile: &UserAvailabilityProfile,
    config: &EngineConfig,
    reference: DateTime<Utc>,
) -> Result<Vec<ResolvedSlot>> {
    let offset = profile.offset_minutes_at(reference)?;

    let resolved = expand_slots(&profile.slots)
        .iter()
        .filter_map(|slot| {
            let length = slot.length_minutes();
            if length <= 0 {
                return None;
            }
            let candidates = profile.candidate_durations(slot, config);
            let durations = tiling_durations(length * 60, candidates, None);
            if durations.is_empty() {
                return None;
            }
            let day_index = slot.day.weekdays()[0].num_days_from_monday();
            let local_start = i64::from(day_index) * MINUTES_PER_DAY + minute_of_day(slot.start);
            Some(ResolvedSlot::from_week_span(local_start - offset, length, durations))
        })
        .collect();

    Ok(resolved)
}

/// Intersect two participants' slots.
///
/// An intersection survives only if each side still has a duration that
/// tiles it. Its durations are the larger of the two sides' smallest viable
/// durations plus every duration both sides accept.
pub fn intersect_slots(old: &[ResolvedSlot], new: &[ResolvedSlot]) -> Vec<ResolvedSlot> {
    let mut intersected = Vec::new();

    for n in new {
        let new_candidates = n.duration_list();
        for o in old {
            let old_candidates = o.duration_list();
            for shift in [-MINUTES_PER_WEEK, 0, MINUTES_PER_WEEK] {
                let start = n.week_start().max(o.week_start() + shift);
                let end = n.week_end().min(o.week_end() + shift);
                if start >= end {
                    continue;
                }

                let seconds = (end - start) * 60;
                let new_viable = tiling_durations(seconds, &new_candidates, None);
                let old_viable = tiling_durations(seconds, &old_candidates, None);
                let (Some(&new_min), Some(&old_min)) = (new_viable.first(), old_viable.first())
                else {
                    continue;
                };

                let mut durations: DurationSet =
                    new_viable.intersection(&old_viable).copied().collect();
                durations.insert(new_min.max(old_min));
                intersected.push(ResolvedSlot::from_week_span(start, end - start, durations));
            }
        }
    }

    intersected
}

/// Reduce N participants' profiles to the slots where all of them are free.
///
/// Profiles are folded left to right. No profiles yields nothing; a single
/// profile yields its own normalized slots. The fold stops as soon as the
/// running result is empty, which also happens when any profile has no usable
/// slots.
pub fn reduce_profiles(
    profiles: &[UserAvailabilityProfile],
    config: &EngineConfig,
    reference: DateTime<Utc>,
) -> Result<Vec<ResolvedSlot>> {
    let Some((first, rest)) = profiles.split_first() else {
        return Ok(Vec::new());
    };

    let mut reduced = normalize_profile(first, config, reference)?;
    for profile in rest {
        if reduced.is_empty() {
            break;
        }
        let slots = normalize_profile(profile, config, reference)?;
        reduced = intersect_slots(&reduced, &slots);
    }

    reduced.sort_by_key(|s| (s.week_start(), s.end_minute));
    let mut seen = BTreeSet::new();
    reduced.retain(|s| seen.insert((s.week_start(), s.end_minute, s.durations.clone())));

    debug!("reduced {} profiles to {} slots", profiles.len(), reduced.len());
    Ok(reduced)
}
