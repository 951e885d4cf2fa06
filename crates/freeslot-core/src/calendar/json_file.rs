//! Calendar backed by a JSON file holding an array of events.
//!
//! Used by the CLI as a stand-in for a real calendar provider: another tool
//! exports events into the file, freeslot reads them and appends its own
//! focus blocks.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::{CalendarEvent, CalendarSource};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct JsonCalendar {
    path: PathBuf,
}

impl JsonCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All events in the file. A missing file is an empty calendar.
    pub fn load(&self) -> Result<Vec<CalendarEvent>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| CoreError::Calendar {
            source_name: self.path.display().to_string(),
            message: "events file is not a JSON array of events".to_string(),
            source: Some(Box::new(e)),
        })
    }

    /// Append `event`, replacing any existing event with the same id.
    pub fn append(&self, event: CalendarEvent) -> Result<()> {
        let mut events = self.load()?;
        events.retain(|existing| existing.id != event.id);
        events.push(event);
        std::fs::write(&self.path, serde_json::to_string_pretty(&events)?)?;
        Ok(())
    }

    /// Remove the event with `id`. Returns whether one was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut events = self.load()?;
        let before = events.len();
        events.retain(|event| event.id != id);
        if events.len() == before {
            return Ok(false);
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&events)?)?;
        Ok(true)
    }
}

impl CalendarSource for JsonCalendar {
    fn name(&self) -> &str {
        "json"
    }

    fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|event| event.overlaps(start, end))
            .collect())
    }
}
