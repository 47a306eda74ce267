//! Reclassify AVAILABLE time as UNAVAILABLE from busy or declared-free sources.
//!
//! Group windows and per-user unavailability records take the same path,
//! [`subtract_busy`]; they differ only in where the pipeline fetches them.

use crate::interval::{intersect_all, merge_overlapping, subtract_all, TimeInterval};
use crate::partition::{AvailableInterval, CalendarPartition};

/// Subtract every busy interval from every AVAILABLE interval.
///
/// For an available interval `b` and busy interval `g`:
/// - no overlap: `b` stays available
/// - `g` covers `b`: all of `b` becomes unavailable
/// - `g` covers one edge: `b` shrinks to the other side
/// - `g` strictly inside `b`: `b` splits in two around `g`
///
/// The covered part is always moved to the unavailable list. Both lists are
/// sorted on return.
pub fn subtract_busy(mut partition: CalendarPartition, busy: &[TimeInterval]) -> CalendarPartition {
    for g in busy.iter().filter(|g| !g.is_empty()) {
        let mut remaining: Vec<AvailableInterval> = Vec::with_capacity(partition.available.len());

        for b in partition.available.drain(..) {
            let interval = b.interval();
            match interval.intersect(g) {
                None => remaining.push(b),
                Some(covered) => {
                    partition.unavailable.push(covered);
                    remaining.extend(interval.subtract(g).into_iter().map(|part| b.reshaped(part)));
                }
            }
        }

        partition.available = remaining;
    }

    partition.sort();
    partition
}

/// Keep only the AVAILABLE time covered by the union of `declared` records.
///
/// Used when a participant states availability as explicit free windows. The
/// records are unioned with [`merge_overlapping`]; available time outside the
/// union becomes unavailable. No records leaves the partition untouched.
pub fn restrict_to_declared(
    mut partition: CalendarPartition,
    declared: &[TimeInterval],
) -> CalendarPartition {
    if declared.is_empty() {
        return partition;
    }

    let union = merge_overlapping(declared);
    let mut kept: Vec<AvailableInterval> = Vec::with_capacity(partition.available.len());

    for b in partition.available.drain(..) {
        let interval = b.interval();
        kept.extend(
            intersect_all(&[interval], &union)
                .into_iter()
                .map(|part| b.reshaped(part)),
        );
        partition
            .unavailable
            .extend(subtract_all(&[interval], &union));
    }

    partition.available = kept;
    partition.sort();
    partition
}

/// Clip every AVAILABLE interval to `range`, dropping what falls outside.
pub fn restrict_to_range(
    mut partition: CalendarPartition,
    range: TimeInterval,
) -> CalendarPartition {
    partition.available = partition
        .available
        .iter()
        .filter_map(|b| b.interval().intersect(&range).map(|part| b.reshaped(part)))
        .collect();
    partition.sort();
    partition
}
