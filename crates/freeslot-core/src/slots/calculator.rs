//! Free-slot computation.
//!
//! Subtracts busy calendar intervals from a day's working window and keeps
//! the remaining gaps that are long enough to be useful.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::window::{normalize_busy, TimeWindow};
use super::working_hours::WorkingWindowConfig;
use crate::error::ConfigError;

/// Default minimum free-slot length in minutes.
pub const DEFAULT_MIN_DURATION_MINUTES: i64 = 60;

/// A contiguous free interval inside the working window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    /// Local hour of `start_time` (0-23).
    pub start_hour: u32,
    /// Local hour of `end_time`; 24 when the slot runs to the end of `date`.
    pub end_hour: u32,
    /// Set once a commitment has been placed into this slot.
    pub is_blocked: bool,
}

impl FreeSlot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// "HH:MM - HH:MM" in `tz`.
    pub fn time_range_label<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{} - {}",
            self.start_time.with_timezone(tz).format("%H:%M"),
            self.end_time.with_timezone(tz).format("%H:%M")
        )
    }

    /// "2h 30m", or "45m" under an hour.
    pub fn duration_label(&self) -> String {
        let hours = self.duration_minutes / 60;
        let minutes = self.duration_minutes % 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }

    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

/// Calculator for free slots within a working window.
#[derive(Debug, Clone)]
pub struct FreeSlotCalculator {
    min_duration_minutes: i64,
}

impl FreeSlotCalculator {
    /// Create a calculator with the default 60 minute threshold.
    pub fn new() -> Self {
        Self {
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
        }
    }

    /// Set the minimum slot duration.
    pub fn with_min_duration(mut self, minutes: i64) -> Self {
        self.min_duration_minutes = minutes;
        self
    }

    pub fn min_duration_minutes(&self) -> i64 {
        self.min_duration_minutes
    }

    /// Compute the free slots of `date`.
    ///
    /// `busy` may be unsorted, overlapping, zero-length or lie partly or
    /// wholly outside the working window; it is normalized before the scan.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidWorkingWindow`] when the window does not
    /// resolve to `start < end` for `date`.
    pub fn compute<Tz: TimeZone>(
        &self,
        date: NaiveDate,
        working_window: &WorkingWindowConfig,
        busy: &[TimeWindow],
        tz: &Tz,
    ) -> Result<Vec<FreeSlot>, ConfigError> {
        let working = working_window.resolve(date, tz)?;
        let slots = self
            .free_windows(&working, busy)
            .into_iter()
            .map(|gap| build_slot(date, gap, tz))
            .collect();
        Ok(slots)
    }

    /// Gaps of `working` not covered by `busy`, at least the minimum
    /// duration long, in ascending order.
    pub fn free_windows(&self, working: &TimeWindow, busy: &[TimeWindow]) -> Vec<TimeWindow> {
        let merged = normalize_busy(busy, working);

        let mut candidates = Vec::with_capacity(merged.len() + 1);
        let mut cursor = working.start;
        for interval in &merged {
            if cursor < interval.start {
                candidates.push(TimeWindow {
                    start: cursor,
                    end: interval.start,
                });
            }
            cursor = cursor.max(interval.end);
        }
        if cursor < working.end {
            candidates.push(TimeWindow {
                start: cursor,
                end: working.end,
            });
        }

        candidates.retain(|gap| gap.duration_minutes() >= self.min_duration_minutes);
        candidates
    }
}

impl Default for FreeSlotCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_slot<Tz: TimeZone>(date: NaiveDate, gap: TimeWindow, tz: &Tz) -> FreeSlot {
    let local_start = gap.start.with_timezone(tz);
    let local_end = gap.end.with_timezone(tz);
    let end_hour = if local_end.date_naive() > date {
        24
    } else {
        local_end.hour()
    };

    FreeSlot {
        date,
        start_time: gap.start,
        end_time: gap.end,
        duration_minutes: gap.duration_minutes(),
        start_hour: local_start.hour(),
        end_hour,
        is_blocked: false,
    }
}

/// Convenience function using the default 60 minute threshold.
pub fn compute_free_slots<Tz: TimeZone>(
    date: NaiveDate,
    working_window: &WorkingWindowConfig,
    busy: &[TimeWindow],
    tz: &Tz,
) -> Result<Vec<FreeSlot>, ConfigError> {
    FreeSlotCalculator::new().compute(date, working_window, busy, tz)
}
