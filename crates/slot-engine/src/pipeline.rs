//! End-to-end availability computation over injected collaborators.
//!
//! The service owns no state besides its configuration and collaborator
//! handles. Each call threads one [`CalendarPartition`] through the stages and
//! awaits collaborators only between stages, so a dropped future leaves nothing
//! behind.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::base_calendar;
use crate::busy::{restrict_to_declared, restrict_to_range, subtract_busy};
use crate::clock::hhmm_opt;
use crate::config::EngineConfig;
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;
use crate::merger::{self, MergeOptions};
use crate::partition::{AvailableInterval, CalendarPartition};
use crate::recurring::{reduce_profiles, UserAvailabilityProfile};
use crate::timestamps::{
    check_meeting_overlap, clamp_requested_range, page_windows, resolve_range,
    validate_requested_range, windows_from_range, OverlapCheck,
};
use crate::window::{clip_to_clock_window, filter_specific_dates};

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// Source of an event's open windows.
#[async_trait]
pub trait EventDirectory: Send + Sync {
    async fn open_windows(&self, event_id: &str) -> Result<Vec<TimeInterval>>;
}

/// Source of a company's group busy windows.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn group_windows(
        &self,
        company_id: &str,
        event_id: Option<&str>,
        range: TimeInterval,
    ) -> Result<Vec<TimeInterval>>;
}

/// Which kind of one-off per-user record to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Time the user is busy.
    Unavailable,
    /// Time the user has explicitly declared free.
    Available,
}

/// Source of per-user one-off busy/free records.
#[async_trait]
pub trait BusyRecordStore: Send + Sync {
    async fn records(
        &self,
        user_ids: &[String],
        event_id: Option<&str>,
        range: TimeInterval,
        kind: RecordKind,
    ) -> Result<Vec<TimeInterval>>;
}

/// How to select availability profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileQuery {
    /// The single profile behind a shareable link.
    Link(String),
    /// Primary profiles of these contacts, scoped to an event when given.
    Contacts {
        contact_ids: Vec<String>,
        event_id: Option<String>,
    },
}

/// Source of recurring availability profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profiles(&self, query: &ProfileQuery) -> Result<Vec<UserAvailabilityProfile>>;
}

/// Annotates available intervals with free tables of a hall.
#[async_trait]
pub trait TableDirectory: Send + Sync {
    async fn annotate(
        &self,
        available: Vec<AvailableInterval>,
        hall_id: &str,
        include_tables: bool,
        duration: Option<u32>,
    ) -> Result<Vec<AvailableInterval>>;
}

/// The collaborator handles a service runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub events: Arc<dyn EventDirectory>,
    pub groups: Arc<dyn GroupDirectory>,
    pub records: Arc<dyn BusyRecordStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub tables: Option<Arc<dyn TableDirectory>>,
}

impl Collaborators {
    /// Use one value for every collaborator role.
    pub fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: EventDirectory
            + GroupDirectory
            + BusyRecordStore
            + ProfileStore
            + TableDirectory
            + 'static,
    {
        Self {
            events: shared.clone(),
            groups: shared.clone(),
            records: shared.clone(),
            profiles: shared.clone(),
            tables: Some(shared),
        }
    }
}

/// Reject collaborator output holding an interval that ends before it starts.
fn well_formed(source: &str, intervals: Vec<TimeInterval>) -> Result<Vec<TimeInterval>> {
    match intervals.iter().find(|i| i.start > i.end) {
        Some(bad) => Err(SlotError::Collaborator(format!(
            "{source} returned an inverted interval {} .. {}",
            bad.start.to_rfc3339(),
            bad.end.to_rfc3339()
        ))),
        None => Ok(intervals),
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An availability query after transport-level parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityRequest {
    /// Meeting-hub page, 1-based.
    pub page: u32,
    pub event_id: Option<String>,
    /// The requesting user's own contact.
    pub contact_id: Option<String>,
    pub host_ids: Vec<String>,
    pub guest_ids: Vec<String>,
    pub host_company_id: Option<String>,
    pub guest_company_id: Option<String>,
    pub requested_start: Option<DateTime<Utc>>,
    pub requested_end: Option<DateTime<Utc>>,
    pub meeting_hub: bool,
    pub link: Option<String>,
    pub hall_id: Option<String>,
    #[serde(with = "hhmm_opt")]
    pub from_time: Option<NaiveTime>,
    #[serde(with = "hhmm_opt")]
    pub to_time: Option<NaiveTime>,
    /// Only this meeting length is acceptable.
    pub duration: Option<u32>,
    pub specific_dates: Vec<NaiveDate>,
    pub include_tables: bool,
}

fn dedup_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if !id.is_empty() && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

impl AvailabilityRequest {
    /// The requester's range, when both ends were given.
    pub fn requested_range(&self) -> Result<Option<TimeInterval>> {
        match (self.requested_start, self.requested_end) {
            (Some(start), Some(end)) => validate_requested_range(start, end).map(Some),
            _ => Ok(None),
        }
    }

    fn has_participants(&self) -> bool {
        self.contact_id.is_some() || !self.host_ids.is_empty() || !self.guest_ids.is_empty()
    }

    /// Users whose busy records apply: the requester (outside meeting hubs),
    /// hosts and guests.
    fn busy_user_ids(&self) -> Vec<String> {
        let own = self.contact_id.iter().filter(|_| !self.meeting_hub);
        dedup_ids(own.chain(&self.host_ids).chain(&self.guest_ids))
    }

    /// Users whose declared free records apply.
    fn declared_user_ids(&self) -> Vec<String> {
        dedup_ids(self.host_ids.iter().chain(&self.guest_ids))
    }

    /// Guests, plus hosts or else the requester.
    fn profile_query(&self) -> Option<ProfileQuery> {
        if let Some(link) = &self.link {
            return Some(ProfileQuery::Link(link.clone()));
        }
        let hosts_or_self: Vec<&String> = if self.host_ids.is_empty() {
            self.contact_id.iter().collect()
        } else {
            self.host_ids.iter().collect()
        };
        let contact_ids = dedup_ids(self.guest_ids.iter().chain(hosts_or_self));
        if contact_ids.is_empty() {
            return None;
        }
        Some(ProfileQuery::Contacts {
            contact_ids,
            event_id: self.event_id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct AvailabilityService {
    collaborators: Collaborators,
    config: EngineConfig,
}

impl AvailabilityService {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the availability partition for `request` as of `now`.
    ///
    /// Meeting-hub requests derive their windows from the requested range or
    /// page; all others use the event's open windows.
    pub async fn availability(
        &self,
        request: &AvailabilityRequest,
        now: DateTime<Utc>,
        include_unavailable: bool,
    ) -> Result<CalendarPartition> {
        let partition = if request.meeting_hub {
            self.meeting_hub(request, now, include_unavailable).await?
        } else {
            self.event_hub(request, now, include_unavailable).await?
        };
        info!(
            "availability computed: {} available, {} unavailable",
            partition.available.len(),
            partition.unavailable.len()
        );
        Ok(partition)
    }

    async fn event_hub(
        &self,
        request: &AvailabilityRequest,
        now: DateTime<Utc>,
        include_unavailable: bool,
    ) -> Result<CalendarPartition> {
        let event_id = request.event_id.as_deref().ok_or(SlotError::MissingEventId)?;
        let windows = self.collaborators.events.open_windows(event_id).await?;
        let windows = well_formed("event directory", windows)?;
        let range = resolve_range(&windows, now, &self.config)?;

        let mut partition = base_calendar::build(range, &windows, None);
        debug!("base calendar for event {event_id}: {} available", partition.available.len());

        if let Some(requested) = request.requested_range()? {
            let clamped = clamp_requested_range(requested, range, now)?;
            partition = restrict_to_range(partition, clamped);
            debug!("clipped to requested range: {} available", partition.available.len());
        }

        if partition.has_available() {
            partition = self.apply_groups(request, partition, range).await?;
            if request.has_participants() {
                partition = self.apply_unavailable(request, partition, range).await?;
            }
        }

        self.finish(request, partition, range, include_unavailable).await
    }

    async fn meeting_hub(
        &self,
        request: &AvailabilityRequest,
        now: DateTime<Utc>,
        include_unavailable: bool,
    ) -> Result<CalendarPartition> {
        let windows = match request.requested_range()? {
            Some(requested) => windows_from_range(requested),
            None => page_windows(request.page, now, &self.config)?,
        };
        let range = resolve_range(&windows, now, &self.config)?;

        let mut partition = base_calendar::build(range, &windows, None);
        debug!("meeting-hub base calendar: {} available", partition.available.len());

        if partition.has_available() && request.has_participants() {
            partition = self.apply_declared(request, partition, range).await?;
            partition = self.apply_unavailable(request, partition, range).await?;
        }

        self.finish(request, partition, range, include_unavailable).await
    }

    /// Clock/date filters, recurring profiles and table annotation.
    async fn finish(
        &self,
        request: &AvailabilityRequest,
        mut partition: CalendarPartition,
        range: TimeInterval,
        include_unavailable: bool,
    ) -> Result<CalendarPartition> {
        if partition.has_available() {
            if let (Some(from), Some(to)) = (request.from_time, request.to_time) {
                partition = clip_to_clock_window(partition, from, to);
            }
            partition = filter_specific_dates(partition, &request.specific_dates);
            debug!("after presentation filters: {} available", partition.available.len());
        }

        if partition.has_available() {
            partition = self
                .apply_profiles(request, partition, range, include_unavailable)
                .await?;
        }

        if let (Some(hall_id), Some(tables)) = (&request.hall_id, &self.collaborators.tables) {
            if partition.has_available() {
                let available = std::mem::take(&mut partition.available);
                partition.available = tables
                    .annotate(available, hall_id, request.include_tables, request.duration)
                    .await?;
                debug!(
                    "annotated tables for hall {hall_id}: {} available",
                    partition.available.len()
                );
            }
        }

        Ok(partition)
    }

    async fn apply_groups(
        &self,
        request: &AvailabilityRequest,
        mut partition: CalendarPartition,
        range: TimeInterval,
    ) -> Result<CalendarPartition> {
        let companies = [&request.guest_company_id, &request.host_company_id];
        for company_id in companies.into_iter().flatten() {
            let windows = self
                .collaborators
                .groups
                .group_windows(company_id, request.event_id.as_deref(), range)
                .await
                .and_then(|w| well_formed("group directory", w))?;
            if !windows.is_empty() {
                partition = subtract_busy(partition, &windows);
                debug!(
                    "applied {} group windows of company {company_id}: {} available",
                    windows.len(),
                    partition.available.len()
                );
            }
        }
        Ok(partition)
    }

    async fn apply_unavailable(
        &self,
        request: &AvailabilityRequest,
        partition: CalendarPartition,
        range: TimeInterval,
    ) -> Result<CalendarPartition> {
        let user_ids = request.busy_user_ids();
        if user_ids.is_empty() || !partition.has_available() {
            return Ok(partition);
        }
        let busy = self
            .collaborators
            .records
            .records(&user_ids, request.event_id.as_deref(), range, RecordKind::Unavailable)
            .await
            .and_then(|r| well_formed("busy record store", r))?;
        if busy.is_empty() {
            return Ok(partition);
        }
        let partition = subtract_busy(partition, &busy);
        debug!(
            "applied {} unavailability records: {} available",
            busy.len(),
            partition.available.len()
        );
        Ok(partition)
    }

    async fn apply_declared(
        &self,
        request: &AvailabilityRequest,
        partition: CalendarPartition,
        range: TimeInterval,
    ) -> Result<CalendarPartition> {
        let user_ids = request.declared_user_ids();
        if user_ids.is_empty() {
            return Ok(partition);
        }
        let declared = self
            .collaborators
            .records
            .records(&user_ids, request.event_id.as_deref(), range, RecordKind::Available)
            .await
            .and_then(|r| well_formed("busy record store", r))?;
        let partition = restrict_to_declared(partition, &declared);
        debug!(
            "applied {} declared availability records: {} available",
            declared.len(),
            partition.available.len()
        );
        Ok(partition)
    }

    async fn apply_profiles(
        &self,
        request: &AvailabilityRequest,
        partition: CalendarPartition,
        range: TimeInterval,
        include_unavailable: bool,
    ) -> Result<CalendarPartition> {
        let Some(query) = request.profile_query() else {
            return Ok(partition);
        };
        let profiles = self.collaborators.profiles.profiles(&query).await?;
        if profiles.is_empty() {
            return Ok(partition);
        }
        for profile in &profiles {
            if let Err(e) = profile.validate() {
                warn!("profile of contact {} failed validation: {e}", profile.contact_id);
            }
        }

        let slots = reduce_profiles(&profiles, &self.config, range.start)?;
        let partition = merger::merge(
            partition,
            &slots,
            MergeOptions {
                include_unavailable,
                want_durations: true,
                exact_duration: request.duration,
            },
        );
        debug!(
            "merged {} recurring slots from {} profiles: {} available",
            slots.len(),
            profiles.len(),
            partition.available.len()
        );
        Ok(partition)
    }

    /// Check a proposed meeting time against an event's open windows.
    ///
    /// Lookup and validation failures are reported as a failed check.
    pub async fn validate_meeting_times(
        &self,
        event_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
        allow_past: bool,
    ) -> OverlapCheck {
        let checked = self
            .collaborators
            .events
            .open_windows(event_id)
            .await
            .and_then(|w| well_formed("event directory", w))
            .and_then(|w| check_meeting_overlap(&w, start, end, now, allow_past));
        checked.unwrap_or_else(|e| {
            warn!("meeting time check for event {event_id} failed: {e}");
            OverlapCheck::rejected(e.to_string())
        })
    }
}
