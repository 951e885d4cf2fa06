//! Half-open time intervals and the busy-interval normalization used by the
//! free-slot calculator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open interval `[start, end)` of absolute instants.
///
/// `start == end` is allowed and denotes an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a window from milliseconds since the Unix epoch.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self, ValidationError> {
        let to_instant = |field: &str, ms: i64| {
            DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
                ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: format!("{ms} ms is out of range"),
                }
            })
        };
        Self::new(to_instant("start", start_ms)?, to_instant("end", end_ms)?)
    }

    /// Whole minutes covered, rounded down.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when the two windows share at least one instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.end > other.start && self.start < other.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Truncate this window to `bounds`. Returns `None` when nothing of
    /// positive width remains.
    pub fn clip_to(&self, bounds: &TimeWindow) -> Option<TimeWindow> {
        if !self.overlaps(bounds) {
            return None;
        }
        let clipped = TimeWindow {
            start: self.start.max(bounds.start),
            end: self.end.min(bounds.end),
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Clip `intervals` to `bounds`, sort them and merge overlapping or touching
/// ones. The result is ordered and pairwise disjoint with gaps of positive
/// width between neighbours.
pub fn normalize_busy(intervals: &[TimeWindow], bounds: &TimeWindow) -> Vec<TimeWindow> {
    let clipped: Vec<TimeWindow> = intervals
        .iter()
        .filter_map(|interval| interval.clip_to(bounds))
        .collect();
    merge_busy(&clipped)
}

/// Sort `intervals` by start and merge overlapping ones. `end == next.start`
/// counts as overlap so no zero-width gap survives between back-to-back
/// events. Zero-length intervals are dropped.
pub fn merge_busy(intervals: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut sorted: Vec<TimeWindow> = intervals.iter().filter(|w| !w.is_empty()).copied().collect();
    sorted.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(current) if current.end >= next.start => {
                current.end = current.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}
