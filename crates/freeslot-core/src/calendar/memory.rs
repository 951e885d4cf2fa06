use chrono::{DateTime, Utc};

use super::{CalendarEvent, CalendarSource};
use crate::error::Result;

/// Vec-backed calendar for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalendar {
    events: Vec<CalendarEvent>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: CalendarEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }
}

impl CalendarSource for MemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|event| event.overlaps(start, end))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn returns_only_overlapping_events() {
        let at = |h| Utc.with_ymd_and_hms(2024, 5, 6, h, 0, 0).unwrap();
        let mut calendar = MemoryCalendar::new();
        calendar.push(CalendarEvent::new("a", "Early", at(6), at(7)));
        calendar.push(CalendarEvent::new("b", "Inside", at(10), at(11)));

        let events = calendar.events_between(at(9), at(17)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "b");
    }
}
