//! # slot-engine
//!
//! Meeting availability as interval algebra over absolute UTC time.
//!
//! An event's open windows become a [`CalendarPartition`] of AVAILABLE and
//! UNAVAILABLE intervals. Group busy windows and per-user records carve time
//! out of it, and participants' recurring weekly profiles are reduced to the
//! slots everyone shares and folded onto it, annotated with the meeting
//! durations that tile each interval exactly.
//!
//! ## Modules
//!
//! - [`interval`] — half-open intervals, merge/subtract/intersect
//! - [`duration`] — meeting durations that tile an interval
//! - [`partition`] — the AVAILABLE/UNAVAILABLE partition
//! - [`timestamps`] — effective query ranges, day windows, overlap checks
//! - [`base_calendar`] — initial partition from open windows
//! - [`busy`] — busy subtraction and declared-free restriction
//! - [`window`] — daily clock window and specific-date filters
//! - [`recurring`] — weekly profiles: expansion, normalization, reduction
//! - [`merger`] — fold reduced slots onto a partition
//! - [`pipeline`] — end-to-end service over injected collaborators
//! - [`memory`] — in-memory collaborators
//! - [`config`] — engine tunables
//! - [`clock`] — `"HH:MM"` times of day
//! - [`error`] — Error types

pub mod base_calendar;
pub mod busy;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod interval;
pub mod memory;
pub mod merger;
pub mod partition;
pub mod pipeline;
pub mod recurring;
pub mod timestamps;
pub mod window;

pub use busy::{restrict_to_declared, restrict_to_range, subtract_busy};
pub use config::EngineConfig;
pub use duration::{tiling_durations, viable_durations, DurationSet};
pub use error::{RangeEdge, Result, SlotError};
pub use interval::{merge_overlapping, TimeInterval};
pub use memory::InMemoryCollaborators;
pub use merger::{merge, MergeOptions};
pub use partition::{AvailableInterval, CalendarPartition};
pub use pipeline::{AvailabilityRequest, AvailabilityService, Collaborators};
pub use recurring::{reduce_profiles, DaySpec, RecurringSlot, ResolvedSlot, UserAvailabilityProfile};
pub use timestamps::{check_meeting_overlap, resolve_range, OverlapCheck};
