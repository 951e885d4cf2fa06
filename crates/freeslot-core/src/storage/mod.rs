mod config;
pub mod migrations;
pub mod slot_db;

pub use config::{CalendarConfig, Config, SlotsConfig};
pub use slot_db::{FreeSlotRecord, HourlySlotDistribution, SlotDb, SlotStats};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `FREESLOT_DATA_DIR` overrides the location entirely. Otherwise it is
/// `~/.config/freeslot[-dev]/`, with `FREESLOT_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FREESLOT_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FREESLOT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("freeslot-dev")
            } else {
                base_dir.join("freeslot")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
