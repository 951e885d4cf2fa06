//! # freeslot Core Library
//!
//! Finds the free time in a working day. Busy calendar events are
//! subtracted from a configured working window and the remaining gaps that
//! are long enough to be useful become free slots, which are stored per
//! date and can later be blocked with focus events.
//!
//! ## Architecture
//!
//! - **Slots**: the pure calculator (clip, sort, merge, scan, filter)
//! - **Calendar**: event sources and filtering of busy/own events
//! - **Storage**: SQLite slot store and TOML configuration
//! - **Planner**: recomputation and maintenance over the three above
//!
//! ## Key Components
//!
//! - [`FreeSlotCalculator`]: free-slot computation
//! - [`SlotDb`]: free-slot persistence
//! - [`Config`]: application configuration
//! - [`CalendarSource`]: trait for calendar inputs

pub mod calendar;
pub mod error;
pub mod planner;
pub mod slots;
pub mod storage;

pub use calendar::{busy_intervals, Availability, CalendarEvent, CalendarSource, JsonCalendar, MemoryCalendar};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use planner::FreeSlotPlanner;
pub use slots::{compute_free_slots, FreeSlot, FreeSlotCalculator, TimeWindow, WorkingWindowConfig};
pub use storage::{Config, FreeSlotRecord, SlotDb};
