//! Calendar input for free-slot computation.
//!
//! Calendars hand back raw events; [`busy_intervals`] turns them into the
//! busy windows the calculator subtracts. Events this system wrote itself
//! (focus blocks placed into free slots) carry a marker and are skipped so
//! a blocked slot never feeds back into the next computation as "busy".

mod json_file;
mod memory;

pub use json_file::JsonCalendar;
pub use memory::MemoryCalendar;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::slots::{FreeSlot, TimeWindow};

/// Default marker embedded in events created by freeslot.
pub const DEFAULT_OWN_EVENT_MARKER: &str = "#freeslot";

/// Free/busy flag of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Busy,
    Free,
    Tentative,
}

/// An event read from (or written to) a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub availability: Availability,
}

impl CalendarEvent {
    /// Create a busy event.
    pub fn new(id: impl Into<String>, title: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            start_time,
            end_time,
            all_day: false,
            availability: Availability::Busy,
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The event written back when a free slot gets blocked. It carries
    /// `marker` so it is excluded from later computations.
    pub fn focus_block(slot_id: i64, slot: &FreeSlot, title: &str, marker: &str, busy: bool) -> Self {
        let availability = if busy {
            Availability::Busy
        } else {
            Availability::Free
        };
        Self::new(format!("focus-{slot_id}"), title, slot.start_time, slot.end_time)
            .with_availability(availability)
            .with_description(format!("{marker} slot={slot_id}"))
    }

    /// Check if this event overlaps with a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Whether this event was created by freeslot.
    pub fn is_own_event(&self, marker: &str) -> bool {
        !marker.is_empty() && (self.title.contains(marker) || self.description.contains(marker))
    }
}

/// A readable calendar.
pub trait CalendarSource {
    /// Human-readable name, used in error messages and logs.
    fn name(&self) -> &str;

    /// Events overlapping `[start, end)`.
    fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>>;
}

/// Busy windows from `events`: only `Busy` events not created by this
/// system. Events with `end < start` are dropped.
pub fn busy_intervals(events: &[CalendarEvent], marker: &str) -> Vec<TimeWindow> {
    events
        .iter()
        .filter(|event| event.availability == Availability::Busy)
        .filter(|event| !event.is_own_event(marker))
        .filter_map(|event| TimeWindow::new(event.start_time, event.end_time).ok())
        .collect()
}
