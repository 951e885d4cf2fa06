//! Free-time slot computation: working windows, busy-interval
//! normalization and the calculator itself.

pub mod calculator;
pub mod window;
pub mod working_hours;

pub use calculator::{compute_free_slots, FreeSlot, FreeSlotCalculator, DEFAULT_MIN_DURATION_MINUTES};
pub use window::{merge_busy, normalize_busy, TimeWindow};
pub use working_hours::WorkingWindowConfig;
