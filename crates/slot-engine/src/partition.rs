//! The AVAILABLE/UNAVAILABLE decomposition of a query range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::DurationSet;
use crate::error::{Result, SlotError};
use crate::interval::{sort_intervals, TimeInterval};

/// A table (meeting room seat) free for part of an available interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTable {
    pub id: String,
    /// Minutes kept free after a meeting at this table.
    pub buffer_minutes: u32,
}

/// Tables free during one sub-span of an available interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tables: Vec<AvailableTable>,
}

/// An available interval, optionally annotated with meeting durations that
/// tile it and with the tables free during it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAvailableInterval")]
pub struct AvailableInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<DurationSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_slots: Vec<TableSlot>,
}

#[derive(Deserialize)]
struct RawAvailableInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    durations: Option<DurationSet>,
    #[serde(default)]
    table_slots: Vec<TableSlot>,
}

impl TryFrom<RawAvailableInterval> for AvailableInterval {
    type Error = SlotError;

    fn try_from(raw: RawAvailableInterval) -> Result<Self> {
        let interval = TimeInterval::try_new(raw.start, raw.end)?;
        Ok(Self {
            durations: raw.durations,
            table_slots: raw.table_slots,
            ..Self::from(interval)
        })
    }
}

impl AvailableInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            durations: None,
            table_slots: Vec::new(),
        }
    }

    pub fn with_durations(interval: TimeInterval, durations: DurationSet) -> Self {
        Self {
            durations: Some(durations),
            ..Self::from(interval)
        }
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }

    /// A copy spanning `interval` that keeps this interval's durations.
    pub fn reshaped(&self, interval: TimeInterval) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
            durations: self.durations.clone(),
            table_slots: Vec::new(),
        }
    }
}

impl From<TimeInterval> for AvailableInterval {
    fn from(interval: TimeInterval) -> Self {
        Self::new(interval.start, interval.end)
    }
}

/// The AVAILABLE/UNAVAILABLE partition threaded through every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarPartition {
    pub query_start: DateTime<Utc>,
    pub query_end: DateTime<Utc>,
    pub available: Vec<AvailableInterval>,
    pub unavailable: Vec<TimeInterval>,
}

impl CalendarPartition {
    pub fn empty(query: TimeInterval) -> Self {
        Self {
            query_start: query.start,
            query_end: query.end,
            available: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    pub fn query(&self) -> TimeInterval {
        TimeInterval::new(self.query_start, self.query_end)
    }

    pub fn has_available(&self) -> bool {
        !self.available.is_empty()
    }

    /// Sort both lists by `(start, end)`.
    pub fn sort(&mut self) {
        self.available.sort_by_key(|a| (a.start, a.end));
        sort_intervals(&mut self.unavailable);
    }

    /// Check the partition invariant: within the query range no two AVAILABLE
    /// intervals overlap, no two UNAVAILABLE intervals overlap, and nothing is
    /// both AVAILABLE and UNAVAILABLE.
    pub fn is_consistent(&self) -> bool {
        let query = self.query();
        let clip = |i: TimeInterval| i.intersect(&query);

        let available: Vec<TimeInterval> =
            self.available.iter().filter_map(|a| clip(a.interval())).collect();
        let unavailable: Vec<TimeInterval> =
            self.unavailable.iter().filter_map(|u| clip(*u)).collect();

        let pairwise_disjoint = |list: &[TimeInterval]| {
            list.iter()
                .enumerate()
                .all(|(i, a)| list[i + 1..].iter().all(|b| !a.overlaps(b)))
        };

        pairwise_disjoint(&available)
            && pairwise_disjoint(&unavailable)
            && available
                .iter()
                .all(|a| unavailable.iter().all(|u| !a.overlaps(u)))
    }
}
