//! Recompute and maintain stored free slots.
//!
//! The planner wires a calendar, the slot store and the user's config
//! together. Every dependency is borrowed from the caller.

use chrono::{Days, NaiveDate, TimeZone};

use crate::calendar::{busy_intervals, CalendarEvent, CalendarSource};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::slots::{FreeSlot, FreeSlotCalculator};
use crate::storage::{Config, FreeSlotRecord, SlotDb};

pub struct FreeSlotPlanner<'a, C: CalendarSource + ?Sized> {
    db: &'a SlotDb,
    calendar: &'a C,
    config: &'a Config,
}

impl<'a, C: CalendarSource + ?Sized> FreeSlotPlanner<'a, C> {
    pub fn new(db: &'a SlotDb, calendar: &'a C, config: &'a Config) -> Self {
        Self {
            db,
            calendar,
            config,
        }
    }

    fn calculator(&self) -> FreeSlotCalculator {
        FreeSlotCalculator::new().with_min_duration(self.config.slots.min_duration_minutes)
    }

    /// Compute the free slots of `date` without storing them.
    pub fn preview_date<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<Vec<FreeSlot>> {
        let window = &self.config.working_window;
        let working = window.resolve(date, tz)?;

        let events = self.calendar.events_between(working.start, working.end)?;
        let busy = busy_intervals(&events, &self.config.calendar.own_event_marker);
        tracing::debug!(
            %date,
            calendar = self.calendar.name(),
            events = events.len(),
            busy = busy.len(),
            "computing free slots"
        );

        Ok(self.calculator().compute(date, window, &busy, tz)?)
    }

    /// Recompute `date` and replace its stored slots.
    pub fn refresh_date<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<Vec<FreeSlotRecord>> {
        let slots = self.preview_date(date, tz)?;
        let records = self.db.replace_slots_for_date(date, &slots)?;
        tracing::info!(
            %date,
            slots = records.len(),
            free_minutes = records.iter().map(|r| r.slot.duration_minutes).sum::<i64>(),
            "free slots refreshed"
        );
        Ok(records)
    }

    /// Refresh `days` consecutive dates starting at `start`.
    pub fn refresh_range<Tz: TimeZone>(&self, start: NaiveDate, days: u32, tz: &Tz) -> Result<Vec<FreeSlotRecord>> {
        let mut records = Vec::new();
        for date in start.iter_days().take(days as usize) {
            records.extend(self.refresh_date(date, tz)?);
        }
        Ok(records)
    }

    /// Block slot `id`: build its focus event, hand it to `publish`, then
    /// mark the slot blocked. Returns the published event.
    ///
    /// The slot is only marked blocked once `publish` succeeds, so a failed
    /// calendar write leaves it available for a retry. The event carries the
    /// configured marker, so writing it back does not turn the slot busy on
    /// the next refresh.
    pub fn block_slot<F>(&self, id: i64, publish: F) -> Result<CalendarEvent>
    where
        F: FnOnce(&CalendarEvent) -> Result<()>,
    {
        let record = self.db.get_slot(id)?.ok_or(DatabaseError::NotFound(id))?;
        if record.slot.is_blocked {
            return Err(ValidationError::InvalidValue {
                field: "slot".to_string(),
                message: format!("slot {id} is already blocked"),
            }
            .into());
        }

        let calendar = &self.config.calendar;
        let event = CalendarEvent::focus_block(
            id,
            &record.slot,
            &calendar.focus_title,
            &calendar.own_event_marker,
            calendar.focus_blocks_busy,
        );
        if let Err(e) = publish(&event) {
            tracing::warn!(slot = id, event = %event.id, error = %e, "focus event not written, slot left unblocked");
            return Err(e);
        }
        self.db.block_slot(id, Some(&event.id))?;
        tracing::info!(slot = id, event = %event.id, "free slot blocked");
        Ok(event)
    }

    /// Remove slots older than the retention period, counted back from
    /// `today`. Returns the number removed.
    pub fn cleanup(&self, today: NaiveDate) -> Result<usize> {
        let retention = Days::new(u64::from(self.config.slots.retention_days));
        let cutoff = today.checked_sub_days(retention).unwrap_or(NaiveDate::MIN);
        let removed = self.db.delete_slots_before(cutoff)?;
        tracing::info!(%cutoff, removed, "old free slots removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Availability, MemoryCalendar};
    use crate::error::{ConfigError, CoreError};
    use crate::slots::WorkingWindowConfig;
    use chrono::{DateTime, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, hour, 0, 0).unwrap()
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.working_window = WorkingWindowConfig::new(9, 0, 17, 0);
        config
    }

    fn calendar() -> MemoryCalendar {
        MemoryCalendar::with_events(vec![
            CalendarEvent::new("lunch", "Lunch", at(12), at(13)),
            CalendarEvent::new("hold", "Hold", at(15), at(16)).with_availability(Availability::Free),
        ])
    }

    #[test]
    fn refresh_stores_computed_slots() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);

        let records = planner.refresh_date(date(), &Utc).unwrap();
        let minutes: Vec<_> = records.iter().map(|r| r.slot.duration_minutes).collect();
        assert_eq!(minutes, vec![180, 240]);
        assert_eq!(db.total_free_minutes(date()).unwrap(), 420);
    }

    #[test]
    fn refresh_twice_keeps_one_copy() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);

        let first = planner.refresh_date(date(), &Utc).unwrap();
        let second = planner.refresh_date(date(), &Utc).unwrap();
        assert_eq!(db.slots_for_date(date()).unwrap().len(), 2);
        let slots = |records: &[FreeSlotRecord]| records.iter().map(|r| r.slot.clone()).collect::<Vec<_>>();
        assert_eq!(slots(&first), slots(&second));
    }

    #[test]
    fn preview_does_not_write() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);

        assert_eq!(planner.preview_date(date(), &Utc).unwrap().len(), 2);
        assert!(db.slots_for_date(date()).unwrap().is_empty());
    }

    #[test]
    fn blocked_focus_event_does_not_become_busy() {
        let db = SlotDb::open_memory().unwrap();
        let config = config();
        let mut calendar = calendar();

        let (slot_id, event) = {
            let planner = FreeSlotPlanner::new(&db, &calendar, &config);
            let records = planner.refresh_date(date(), &Utc).unwrap();
            let id = records[0].id;
            (id, planner.block_slot(id, |_| Ok(())).unwrap())
        };
        assert!(db.get_slot(slot_id).unwrap().unwrap().slot.is_blocked);

        calendar.push(event.with_availability(Availability::Busy));
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);
        let minutes: Vec<_> = planner
            .refresh_date(date(), &Utc)
            .unwrap()
            .iter()
            .map(|r| r.slot.duration_minutes)
            .collect();
        assert_eq!(minutes, vec![180, 240]);
    }

    #[test]
    fn blocking_twice_is_rejected() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);
        let id = planner.refresh_date(date(), &Utc).unwrap()[0].id;

        planner.block_slot(id, |_| Ok(())).unwrap();
        assert!(matches!(planner.block_slot(id, |_| Ok(())), Err(CoreError::Validation(_))));
        assert!(matches!(
            planner.block_slot(id + 100, |_| Ok(())),
            Err(CoreError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[test]
    fn failed_publish_leaves_slot_available() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);
        let id = planner.refresh_date(date(), &Utc).unwrap()[0].id;

        let err = planner
            .block_slot(id, |event| {
                Err(CoreError::Calendar {
                    source_name: "test".to_string(),
                    message: format!("cannot write {}", event.id),
                    source: None,
                })
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Calendar { .. }));

        let record = db.get_slot(id).unwrap().unwrap();
        assert!(!record.slot.is_blocked);
        assert!(record.focus_event_id.is_none());

        let mut written = None;
        let event = planner
            .block_slot(id, |event| {
                written = Some(event.id.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(written.as_deref(), Some(event.id.as_str()));
        assert_eq!(db.get_slot(id).unwrap().unwrap().focus_event_id, Some(event.id));
    }

    #[test]
    fn misconfigured_window_surfaces_config_error() {
        let db = SlotDb::open_memory().unwrap();
        let calendar = calendar();
        let mut config = config();
        config.working_window = WorkingWindowConfig::new(17, 0, 9, 0);
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);

        let err = planner.refresh_date(date(), &Utc).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::InvalidWorkingWindow { .. })));
    }

    #[test]
    fn refresh_range_and_cleanup() {
        let db = SlotDb::open_memory().unwrap();
        let (calendar, config) = (calendar(), config());
        let planner = FreeSlotPlanner::new(&db, &calendar, &config);

        let records = planner.refresh_range(date(), 3, &Utc).unwrap();
        // Only the first day has events.
        assert_eq!(records.len(), 2 + 1 + 1);

        // Retention is 7 days, so from the 14th everything before the 7th goes.
        let today = date() + Days::new(8);
        assert_eq!(planner.cleanup(today).unwrap(), 2);
        assert!(db.slots_for_date(date()).unwrap().is_empty());
        assert_eq!(db.slots_for_date(date() + Days::new(1)).unwrap().len(), 1);
    }
}
