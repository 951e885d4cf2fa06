//! SQLite storage for computed free slots.
//!
//! A date's slots are only ever replaced wholesale ([`SlotDb::replace_slots_for_date`]);
//! the one in-place mutation is the blocked flag.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::slots::FreeSlot;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "id, local_date, start_time_ms, end_time_ms, duration_minutes,
     start_hour, end_hour, is_blocked, focus_event_id, created_at";

/// A stored free slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeSlotRecord {
    pub id: i64,
    #[serde(flatten)]
    pub slot: FreeSlot,
    /// Calendar event that blocked this slot, if any.
    pub focus_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SlotStats {
    pub slot_count: u64,
    pub total_minutes: i64,
    pub avg_minutes: f64,
    pub max_minutes: i64,
}

/// Slot count and mean length per starting hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySlotDistribution {
    pub start_hour: u32,
    pub slot_count: u64,
    pub avg_duration: f64,
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn instant_from_ms(column: usize, ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| conversion_error(column, format!("timestamp {ms} out of range")))
}

fn row_to_record(row: &rusqlite::Row) -> Result<FreeSlotRecord, rusqlite::Error> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| conversion_error(1, format!("bad local_date '{date_str}': {e}")))?;

    let created_str: String = row.get(9)?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(9, format!("bad created_at '{created_str}': {e}")))?;

    Ok(FreeSlotRecord {
        id: row.get(0)?,
        slot: FreeSlot {
            date,
            start_time: instant_from_ms(2, row.get(2)?)?,
            end_time: instant_from_ms(3, row.get(3)?)?,
            duration_minutes: row.get(4)?,
            start_hour: row.get(5)?,
            end_hour: row.get(6)?,
            is_blocked: row.get(7)?,
        },
        focus_event_id: row.get(8)?,
        created_at,
    })
}

/// SQLite database for free slots.
///
/// Passed explicitly to whatever orchestrates recomputation; there is no
/// process-wide instance.
pub struct SlotDb {
    conn: Connection,
}

impl SlotDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/freeslot.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("freeslot.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Replace every slot of `date` with `slots` in one transaction.
    ///
    /// # Errors
    /// Fails without touching the table if any slot belongs to another date.
    pub fn replace_slots_for_date(&self, date: NaiveDate, slots: &[FreeSlot]) -> Result<Vec<FreeSlotRecord>> {
        if let Some(stray) = slots.iter().find(|s| s.date != date) {
            return Err(ValidationError::InvalidValue {
                field: "date".to_string(),
                message: format!("slot dated {} cannot be stored under {date}", stray.date),
            }
            .into());
        }

        let key = date_key(date);
        let created_at = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM free_slots WHERE local_date = ?1", params![key])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO free_slots
                    (local_date, start_time_ms, end_time_ms, duration_minutes,
                     start_hour, end_hour, is_blocked, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for slot in slots {
                insert.execute(params![
                    key,
                    slot.start_time.timestamp_millis(),
                    slot.end_time.timestamp_millis(),
                    slot.duration_minutes,
                    slot.start_hour,
                    slot.end_hour,
                    slot.is_blocked,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(%date, removed, inserted = slots.len(), "replaced free slots");
        self.slots_for_date(date)
    }

    fn query_records<P: rusqlite::Params>(&self, filter: &str, params: P) -> Result<Vec<FreeSlotRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM free_slots {filter}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_one<P: rusqlite::Params>(&self, filter: &str, params: P) -> Result<Option<FreeSlotRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM free_slots {filter}");
        Ok(self.conn.query_row(&sql, params, row_to_record).optional()?)
    }

    pub fn get_slot(&self, id: i64) -> Result<Option<FreeSlotRecord>> {
        self.query_one("WHERE id = ?1", params![id])
    }

    /// All slots of `date`, earliest first.
    pub fn slots_for_date(&self, date: NaiveDate) -> Result<Vec<FreeSlotRecord>> {
        self.query_records(
            "WHERE local_date = ?1 ORDER BY start_time_ms",
            params![date_key(date)],
        )
    }

    /// Unblocked slots of `date` lasting at least `min_minutes`.
    pub fn available_slots_for_date(&self, date: NaiveDate, min_minutes: i64) -> Result<Vec<FreeSlotRecord>> {
        self.query_records(
            "WHERE local_date = ?1 AND duration_minutes >= ?2 AND is_blocked = 0
             ORDER BY start_time_ms",
            params![date_key(date), min_minutes],
        )
    }

    /// Sum of all slot minutes on `date`, blocked or not.
    pub fn total_free_minutes(&self, date: NaiveDate) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM free_slots WHERE local_date = ?1",
            params![date_key(date)],
            |row| row.get(0),
        )?)
    }

    /// Sum of unblocked slot minutes on `date` from slots of at least `min_minutes`.
    pub fn available_free_minutes(&self, date: NaiveDate, min_minutes: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM free_slots
             WHERE local_date = ?1 AND duration_minutes >= ?2 AND is_blocked = 0",
            params![date_key(date), min_minutes],
            |row| row.get(0),
        )?)
    }

    /// First unblocked slot starting after `now`.
    pub fn next_available_slot(&self, now: DateTime<Utc>, min_minutes: i64) -> Result<Option<FreeSlotRecord>> {
        self.query_one(
            "WHERE start_time_ms > ?1 AND duration_minutes >= ?2 AND is_blocked = 0
             ORDER BY start_time_ms LIMIT 1",
            params![now.timestamp_millis(), min_minutes],
        )
    }

    /// Unblocked slot containing `now`.
    pub fn current_free_slot(&self, now: DateTime<Utc>) -> Result<Option<FreeSlotRecord>> {
        self.query_one(
            "WHERE start_time_ms <= ?1 AND end_time_ms > ?1 AND is_blocked = 0
             ORDER BY start_time_ms LIMIT 1",
            params![now.timestamp_millis()],
        )
    }

    /// Mark a slot blocked, optionally remembering the calendar event that
    /// now occupies it.
    ///
    /// # Errors
    /// Returns [`DatabaseError::NotFound`] for an unknown id.
    pub fn block_slot(&self, id: i64, focus_event_id: Option<&str>) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE free_slots SET is_blocked = 1, focus_event_id = ?2 WHERE id = ?1",
            params![id, focus_event_id],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(id).into());
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`DatabaseError::NotFound`] for an unknown id.
    pub fn unblock_slot(&self, id: i64) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE free_slots SET is_blocked = 0, focus_event_id = NULL WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(id).into());
        }
        Ok(())
    }

    /// Delete slots dated before `date`. Returns the number removed.
    pub fn delete_slots_before(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM free_slots WHERE local_date < ?1",
            params![date_key(date)],
        )?)
    }

    /// Aggregate over `from..=to`.
    pub fn slot_stats(&self, from: NaiveDate, to: NaiveDate) -> Result<SlotStats> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(duration_minutes), 0),
                    COALESCE(AVG(duration_minutes), 0.0),
                    COALESCE(MAX(duration_minutes), 0)
             FROM free_slots
             WHERE local_date >= ?1 AND local_date <= ?2",
            params![date_key(from), date_key(to)],
            |row| {
                Ok(SlotStats {
                    slot_count: row.get(0)?,
                    total_minutes: row.get(1)?,
                    avg_minutes: row.get(2)?,
                    max_minutes: row.get(3)?,
                })
            },
        )?)
    }

    pub fn hourly_distribution(&self, date: NaiveDate) -> Result<Vec<HourlySlotDistribution>> {
        let mut stmt = self.conn.prepare(
            "SELECT start_hour, COUNT(*), AVG(duration_minutes)
             FROM free_slots
             WHERE local_date = ?1
             GROUP BY start_hour
             ORDER BY start_hour",
        )?;
        let rows = stmt.query_map(params![date_key(date)], |row| {
            Ok(HourlySlotDistribution {
                start_hour: row.get(0)?,
                slot_count: row.get(1)?,
                avg_duration: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
