//! Wall-clock times of day, written as `"HH:MM"`.

use chrono::{NaiveTime, Timelike};

use crate::error::{Result, SlotError};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parse `"HH:MM"` (or `"HH:MM:SS"`) into a time of day.
pub fn parse_clock(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| {
            SlotError::InvalidTimeSlot(format!("invalid clock time '{}', expected HH:MM", s))
        })
}

pub fn format_clock(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Minutes since midnight, ignoring seconds.
pub fn minute_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// Serde adapter for `NaiveTime` fields stored as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_clock(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `"HH:MM"` fields.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        t: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => serializer.serialize_some(&super::format_clock(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse_clock(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
