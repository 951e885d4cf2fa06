//! Free slot subcommands.
//!
//! Calendar events are read from a JSON events file (see
//! `calendar.events_path`); dates are interpreted in the local time zone.

use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use freeslot_core::{Config, FreeSlotPlanner, JsonCalendar, SlotDb};
use serde_json::json;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum SlotsAction {
    /// Recompute free slots and store them (replaces existing slots for each date)
    Compute {
        /// First date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Number of consecutive days to compute
        #[arg(long, default_value_t = 1)]
        days: u32,
        /// Events file, overrides calendar.events_path
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Compute free slots without storing them
    Preview {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// List stored slots for a date
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only unblocked slots meeting the minimum duration
        #[arg(long)]
        available: bool,
    },
    /// Total free minutes for a date
    Total {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only count unblocked slots meeting the minimum duration
        #[arg(long)]
        available: bool,
    },
    /// Next unblocked slot starting after now
    Next,
    /// Unblocked slot in progress right now
    Current,
    /// Block a slot and write a focus event to the calendar
    Block {
        id: i64,
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Unblock a slot and remove its focus event
    Unblock {
        id: i64,
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Aggregate statistics over a date range (inclusive)
    Stats {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Slot count and average length per starting hour
    Hourly {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete slots older than slots.retention_days
    Cleanup,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn calendar(config: &Config, events: Option<PathBuf>) -> Result<JsonCalendar, Box<dyn std::error::Error>> {
    let path = match events {
        Some(path) => path,
        None => config.events_path()?,
    };
    Ok(JsonCalendar::new(path))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run(action: SlotsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = SlotDb::open()?;
    let min_minutes = config.slots.min_duration_minutes;

    match action {
        SlotsAction::Compute { date, days, events } => {
            let calendar = calendar(&config, events)?;
            let planner = FreeSlotPlanner::new(&db, &calendar, &config);
            let records = planner.refresh_range(date.unwrap_or_else(today), days, &Local)?;
            print_json(&records)?;
        }
        SlotsAction::Preview { date, events } => {
            let calendar = calendar(&config, events)?;
            let planner = FreeSlotPlanner::new(&db, &calendar, &config);
            let slots = planner.preview_date(date.unwrap_or_else(today), &Local)?;
            print_json(&slots)?;
        }
        SlotsAction::List { date, available } => {
            let date = date.unwrap_or_else(today);
            let records = if available {
                db.available_slots_for_date(date, min_minutes)?
            } else {
                db.slots_for_date(date)?
            };
            print_json(&records)?;
        }
        SlotsAction::Total { date, available } => {
            let date = date.unwrap_or_else(today);
            let minutes = if available {
                db.available_free_minutes(date, min_minutes)?
            } else {
                db.total_free_minutes(date)?
            };
            print_json(&json!({ "date": date, "minutes": minutes }))?;
        }
        SlotsAction::Next => {
            print_json(&db.next_available_slot(Utc::now(), min_minutes)?)?;
        }
        SlotsAction::Current => {
            print_json(&db.current_free_slot(Utc::now())?)?;
        }
        SlotsAction::Block { id, events } => {
            let calendar = calendar(&config, events)?;
            let planner = FreeSlotPlanner::new(&db, &calendar, &config);
            let event = planner.block_slot(id, |event| calendar.append(event.clone()))?;
            print_json(&event)?;
        }
        SlotsAction::Unblock { id, events } => {
            let calendar = calendar(&config, events)?;
            let record = db
                .get_slot(id)?
                .ok_or_else(|| format!("free slot {id} not found"))?;
            db.unblock_slot(id)?;
            let removed = match &record.focus_event_id {
                Some(event_id) => calendar.remove(event_id)?,
                None => false,
            };
            print_json(&json!({ "id": id, "unblocked": true, "focus_event_removed": removed }))?;
        }
        SlotsAction::Stats { from, to } => {
            let to = to.unwrap_or_else(today);
            let from = from.unwrap_or(to);
            print_json(&db.slot_stats(from, to)?)?;
        }
        SlotsAction::Hourly { date } => {
            print_json(&db.hourly_distribution(date.unwrap_or_else(today))?)?;
        }
        SlotsAction::Cleanup => {
            let calendar = calendar(&config, None)?;
            let planner = FreeSlotPlanner::new(&db, &calendar, &config);
            let removed = planner.cleanup(today())?;
            print_json(&json!({ "removed": removed }))?;
        }
    }
    Ok(())
}
