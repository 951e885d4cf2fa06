//! Daily working-hour window configuration.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::window::TimeWindow;
use crate::error::ConfigError;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Working hours for a day, as wall-clock offsets from local midnight.
///
/// `end_hour == 24` (with `end_minute == 0`) means end-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingWindowConfig {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub start_minute: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default)]
    pub end_minute: u32,
}

fn default_start_hour() -> u32 {
    6
}
fn default_end_hour() -> u32 {
    24
}

impl Default for WorkingWindowConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            start_minute: 0,
            end_hour: default_end_hour(),
            end_minute: 0,
        }
    }
}

impl WorkingWindowConfig {
    pub fn new(start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Self {
        Self {
            start_hour,
            start_minute,
            end_hour,
            end_minute,
        }
    }

    /// Check hour/minute ranges. Does not require `start < end`; that is
    /// checked when the window is resolved for a date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: format!("working_window.{key}"),
            message,
        };
        if self.start_hour > 23 {
            return Err(invalid("start_hour", format!("{} is not in 0-23", self.start_hour)));
        }
        if self.start_minute > 59 {
            return Err(invalid("start_minute", format!("{} is not in 0-59", self.start_minute)));
        }
        if self.end_hour > 24 {
            return Err(invalid("end_hour", format!("{} is not in 0-24", self.end_hour)));
        }
        if self.end_minute > 59 {
            return Err(invalid("end_minute", format!("{} is not in 0-59", self.end_minute)));
        }
        if self.end_hour == 24 && self.end_minute != 0 {
            return Err(invalid(
                "end_minute",
                "must be 0 when end_hour is 24".to_string(),
            ));
        }
        Ok(())
    }

    fn start_offset(&self) -> u32 {
        self.start_hour * 60 + self.start_minute
    }

    fn end_offset(&self) -> u32 {
        self.end_hour * 60 + self.end_minute
    }

    /// Resolve to absolute instants for `date` in `tz`.
    ///
    /// Start and end are read as wall-clock times on `date`; `24:00` is the
    /// local midnight starting the next date, so the window follows DST
    /// changes. Overnight windows (`end <= start`) are not interpreted and
    /// fail with [`ConfigError::InvalidWorkingWindow`].
    pub fn resolve<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<TimeWindow, ConfigError> {
        let start = wall_clock_instant(date, self.start_offset(), tz)?;
        let end = wall_clock_instant(date, self.end_offset(), tz)?;
        if start >= end {
            return Err(ConfigError::InvalidWorkingWindow { date, start, end });
        }
        Ok(TimeWindow { start, end })
    }

    /// Length of the working day in minutes. Unlike [`resolve`](Self::resolve)
    /// this wraps past midnight: 22:00-06:00 is 480 minutes.
    pub fn working_minutes(&self) -> u32 {
        let (start, end) = (self.start_offset(), self.end_offset());
        if end > start {
            end - start
        } else {
            MINUTES_PER_DAY - start + end
        }
    }

    /// "HH:MM - HH:MM"
    pub fn time_range_label(&self) -> String {
        format!(
            "{:02}:{:02} - {:02}:{:02}",
            self.start_hour, self.start_minute, self.end_hour, self.end_minute
        )
    }
}

/// First instant of `date` in `tz`, as UTC.
pub(crate) fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>, ConfigError> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "date".to_string(),
            message: format!("{date} has no local midnight in this time zone"),
        })
}

/// Instant of the wall-clock time `offset` minutes into `date`.
///
/// `MINUTES_PER_DAY` is the next date's midnight. A time skipped by a DST
/// jump is counted forward from midnight, which lands just after the jump.
fn wall_clock_instant<Tz: TimeZone>(date: NaiveDate, offset: u32, tz: &Tz) -> Result<DateTime<Utc>, ConfigError> {
    if offset >= MINUTES_PER_DAY {
        let next = date.succ_opt().ok_or_else(|| ConfigError::InvalidValue {
            key: "date".to_string(),
            message: format!("{date} has no following date"),
        })?;
        return local_midnight(next, tz);
    }
    let time = NaiveTime::MIN + Duration::minutes(i64::from(offset));
    match tz.from_local_datetime(&date.and_time(time)).earliest() {
        Some(dt) => Ok(dt.with_timezone(&Utc)),
        None => Ok(local_midnight(date, tz)? + Duration::minutes(i64::from(offset))),
    }
}
