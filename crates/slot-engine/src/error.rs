//! Error types for slot-engine operations.
//!
//! Only the boundary stages (range resolution, profile validation, config
//! loading, collaborator calls) produce errors. The interval algebra, busy
//! subtraction and merger are total over well-formed values.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Which edge of a requested range fell outside the event's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEdge {
    Start,
    End,
}

impl std::fmt::Display for RangeEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeEdge::Start => f.write_str("start"),
            RangeEdge::End => f.write_str("end"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Event is closed: last open window ended at {0}")]
    EventClosed(DateTime<Utc>),

    #[error("Requested range is out of the event's on-boarding window ({edge} edge at {at})")]
    OutOfBounds { edge: RangeEdge, at: DateTime<Utc> },

    #[error("Event has no open windows")]
    NoTimestamps,

    #[error("Event id is required for event-hub availability")]
    MissingEventId,

    #[error("Invalid duration {0}: durations must be positive multiples of 15 minutes")]
    InvalidDuration(u32),

    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
