//! In-memory collaborators, loadable from JSON.
//!
//! Backs the integration tests and the `slots` CLI. The record filters mirror
//! what a persistent store is expected to do for each query.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::interval::{subtract_all, TimeInterval};
use crate::partition::{AvailableInterval, AvailableTable, TableSlot};
use crate::pipeline::{
    BusyRecordStore, EventDirectory, GroupDirectory, ProfileQuery, ProfileStore, RecordKind,
    TableDirectory,
};
use crate::recurring::UserAvailabilityProfile;

/// A company group's busy window, optionally tied to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub span: TimeInterval,
}

/// A one-off per-user busy or free record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub kind: RecordKind,
    #[serde(flatten)]
    pub span: TimeInterval,
}

/// A table in a hall and the meetings already booked at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallTable {
    pub id: String,
    #[serde(default)]
    pub buffer_minutes: u32,
    #[serde(default)]
    pub booked: Vec<TimeInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCollaborators {
    /// Open windows per event id.
    pub events: BTreeMap<String, Vec<TimeInterval>>,
    /// Group windows per company id.
    pub groups: BTreeMap<String, Vec<GroupWindow>>,
    pub records: Vec<UserRecord>,
    pub profiles: Vec<UserAvailabilityProfile>,
    /// Tables per hall id.
    pub halls: BTreeMap<String, Vec<HallTable>>,
}

/// A record scoped to an event matches queries for that event only; an
/// unscoped record matches every query.
fn event_matches(record: Option<&str>, query: Option<&str>) -> bool {
    match (record, query) {
        (Some(r), Some(q)) => r == q,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

impl InMemoryCollaborators {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SlotError::Collaborator(e.to_string()))
    }

    /// Free pieces of `interval` at `table`, at least `duration` minutes long.
    ///
    /// Each booking blocks its table for `buffer_minutes` after it ends.
    fn free_pieces(
        table: &HallTable,
        interval: TimeInterval,
        duration: Option<u32>,
    ) -> Vec<TimeInterval> {
        let buffer = Duration::minutes(i64::from(table.buffer_minutes));
        let blocked: Vec<TimeInterval> = table
            .booked
            .iter()
            .map(|b| TimeInterval::new(b.start, b.end + buffer))
            .collect();
        let minimum = i64::from(duration.unwrap_or(0));
        subtract_all(&[interval], &blocked)
            .into_iter()
            .filter(|piece| piece.length_minutes() >= minimum)
            .collect()
    }
}

#[async_trait]
impl EventDirectory for InMemoryCollaborators {
    async fn open_windows(&self, event_id: &str) -> Result<Vec<TimeInterval>> {
        Ok(self.events.get(event_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GroupDirectory for InMemoryCollaborators {
    async fn group_windows(
        &self,
        company_id: &str,
        event_id: Option<&str>,
        range: TimeInterval,
    ) -> Result<Vec<TimeInterval>> {
        let Some(windows) = self.groups.get(company_id) else {
            return Ok(Vec::new());
        };
        Ok(windows
            .iter()
            .filter(|w| event_matches(w.event_id.as_deref(), event_id))
            .map(|w| w.span)
            .filter(|w| w.overlaps(&range))
            .collect())
    }
}

#[async_trait]
impl BusyRecordStore for InMemoryCollaborators {
    /// Busy records are those starting or ending inside `range`; free records
    /// must lie wholly inside it.
    async fn records(
        &self,
        user_ids: &[String],
        event_id: Option<&str>,
        range: TimeInterval,
        kind: RecordKind,
    ) -> Result<Vec<TimeInterval>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.kind == kind && user_ids.contains(&r.user_id))
            .filter(|r| event_matches(r.event_id.as_deref(), event_id))
            .filter(|r| match kind {
                RecordKind::Unavailable => {
                    (r.span.start >= range.start && r.span.start < range.end)
                        || (r.span.end > range.start && r.span.end <= range.end)
                }
                RecordKind::Available => range.covers(&r.span),
            })
            .map(|r| r.span)
            .collect())
    }
}

#[async_trait]
impl ProfileStore for InMemoryCollaborators {
    async fn profiles(&self, query: &ProfileQuery) -> Result<Vec<UserAvailabilityProfile>> {
        let found = match query {
            ProfileQuery::Link(link) => self
                .profiles
                .iter()
                .filter(|p| p.link.as_deref() == Some(link.as_str()))
                .take(1)
                .cloned()
                .collect(),
            ProfileQuery::Contacts {
                contact_ids,
                event_id,
            } => self
                .profiles
                .iter()
                .filter(|p| p.primary && contact_ids.contains(&p.contact_id))
                .filter(|p| event_id.is_none() || p.event_id == *event_id)
                .cloned()
                .collect(),
        };
        Ok(found)
    }
}

#[async_trait]
impl TableDirectory for InMemoryCollaborators {
    /// Intervals where no table is free are dropped. Table slots group tables
    /// by the identical free span they offer.
    async fn annotate(
        &self,
        available: Vec<AvailableInterval>,
        hall_id: &str,
        include_tables: bool,
        duration: Option<u32>,
    ) -> Result<Vec<AvailableInterval>> {
        let tables = self.halls.get(hall_id).map(Vec::as_slice).unwrap_or_default();
        let mut annotated = Vec::with_capacity(available.len());

        for mut a in available {
            let mut spans: BTreeMap<(DateTime<Utc>, DateTime<Utc>), Vec<AvailableTable>> =
                BTreeMap::new();
            for table in tables {
                for piece in Self::free_pieces(table, a.interval(), duration) {
                    spans.entry((piece.start, piece.end)).or_default().push(AvailableTable {
                        id: table.id.clone(),
                        buffer_minutes: table.buffer_minutes,
                    });
                }
            }
            if spans.is_empty() {
                continue;
            }
            a.table_slots = if include_tables {
                spans
                    .into_iter()
                    .map(|((start, end), tables)| TableSlot { start, end, tables })
                    .collect()
            } else {
                Vec::new()
            };
            annotated.push(a);
        }

        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn scoped_records_match_only_their_event() {
        assert!(event_matches(None, Some("evt")));
        assert!(event_matches(Some("evt"), Some("evt")));
        assert!(!event_matches(Some("evt"), Some("other")));
        assert!(!event_matches(Some("evt"), None));
    }

    #[test]
    fn table_buffer_extends_bookings() {
        let table = HallTable {
            id: "t1".into(),
            buffer_minutes: 15,
            booked: vec![TimeInterval::new(at(10, 0), at(11, 0))],
        };
        let whole = TimeInterval::new(at(9, 0), at(12, 0));
        let pieces = InMemoryCollaborators::free_pieces(&table, whole, Some(30));
        assert_eq!(
            pieces,
            vec![
                TimeInterval::new(at(9, 0), at(10, 0)),
                TimeInterval::new(at(11, 15), at(12, 0)),
            ]
        );
    }

    #[test]
    fn pieces_shorter_than_duration_are_dropped() {
        let table = HallTable {
            id: "t1".into(),
            buffer_minutes: 0,
            booked: vec![TimeInterval::new(at(9, 20), at(12, 0))],
        };
        let whole = TimeInterval::new(at(9, 0), at(12, 0));
        let pieces = InMemoryCollaborators::free_pieces(&table, whole, Some(30));
        assert!(pieces.is_empty());
    }

    #[test]
    fn inverted_open_window_fails_to_load() {
        let json = r#"{
            "events": {
                "evt": [{ "start": "2026-03-20T09:00:00Z", "end": "2026-03-18T17:00:00Z" }]
            }
        }"#;
        let err = InMemoryCollaborators::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, SlotError::Collaborator(ref msg) if msg.contains("Invalid date range"))
        );
    }

    #[test]
    fn inverted_records_and_bookings_fail_to_load() {
        let record = r#"{
            "records": [{
                "user_id": "u1", "kind": "unavailable",
                "start": "2026-03-16T13:00:00Z", "end": "2026-03-16T12:00:00Z"
            }]
        }"#;
        assert!(InMemoryCollaborators::from_json_str(record).is_err());

        let group = r#"{
            "groups": {
                "acme": [{ "start": "2026-03-16T13:00:00Z", "end": "2026-03-16T12:00:00Z" }]
            }
        }"#;
        assert!(InMemoryCollaborators::from_json_str(group).is_err());

        let booking = r#"{
            "halls": { "h1": [{
                "id": "t1",
                "booked": [{ "start": "2026-03-16T13:00:00Z", "end": "2026-03-16T12:00:00Z" }]
            }] }
        }"#;
        assert!(InMemoryCollaborators::from_json_str(booking).is_err());
    }

    #[test]
    fn flattened_records_keep_their_wire_shape() {
        let json = r#"{
            "records": [{
                "user_id": "u1", "event_id": "evt", "kind": "available",
                "start": "2026-03-02T09:00:00Z", "end": "2026-03-02T10:00:00Z"
            }]
        }"#;
        let store = InMemoryCollaborators::from_json_str(json).unwrap();
        assert_eq!(store.records[0].span, TimeInterval::new(at(9, 0), at(10, 0)));
        assert_eq!(store.records[0].event_id.as_deref(), Some("evt"));
    }
}
