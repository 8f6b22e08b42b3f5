//! Roster snapshot store and its SQLite implementation.
//!
//! The roster is stored whole, as the JSON array callers see on the wire,
//! in a single `roster_snapshot` row. Imports additionally append a counter
//! row to `scan_log`.

use crate::db::DbError;
use crate::model::patient::{PatientEntry, Roster};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serde(serde_json::Error),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serde(err) => write!(f, "roster snapshot is not valid: {err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Counters for one imported scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRecord {
    pub scanned_at: DateTime<Utc>,
    pub parsed: usize,
    pub matched: usize,
    pub added: usize,
    pub retained: usize,
}

/// Snapshot persistence for a roster.
pub trait RosterStore {
    /// Returns the saved roster, or an empty one when nothing was saved.
    fn load(&self) -> StoreResult<Roster>;
    /// Replaces the saved roster.
    fn save(&self, roster: &[PatientEntry]) -> StoreResult<()>;
    /// Removes the saved roster. Scan history is kept.
    fn clear(&self) -> StoreResult<()>;
    fn record_scan(&self, record: &ScanRecord) -> StoreResult<()>;
    /// Most recent scans first.
    fn scan_history(&self, limit: u32) -> StoreResult<Vec<ScanRecord>>;
}

/// Roster store over a borrowed, migrated connection.
pub struct SqliteRosterStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRosterStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RosterStore for SqliteRosterStore<'_> {
    fn load(&self) -> StoreResult<Roster> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM roster_snapshot WHERE id = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let roster: Roster = match payload {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        debug!(
            "event=roster_load module=repo status=ok patients={}",
            roster.len()
        );
        Ok(roster)
    }

    fn save(&self, roster: &[PatientEntry]) -> StoreResult<()> {
        let payload = serde_json::to_string(roster)?;
        self.conn.execute(
            "INSERT INTO roster_snapshot (id, payload, patient_count, saved_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                patient_count = excluded.patient_count,
                saved_at = excluded.saved_at;",
            params![
                payload,
                count_to_db(roster.len()),
                Utc::now().timestamp_millis()
            ],
        )?;
        debug!(
            "event=roster_save module=repo status=ok patients={} bytes={}",
            roster.len(),
            payload.len()
        );
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let removed = self.conn.execute("DELETE FROM roster_snapshot;", [])?;
        info!("event=roster_clear module=repo status=ok removed={removed}");
        Ok(())
    }

    fn record_scan(&self, record: &ScanRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO scan_log (scanned_at, parsed, matched, added, retained)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.scanned_at.timestamp_millis(),
                count_to_db(record.parsed),
                count_to_db(record.matched),
                count_to_db(record.added),
                count_to_db(record.retained),
            ],
        )?;
        Ok(())
    }

    fn scan_history(&self, limit: u32) -> StoreResult<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT scanned_at, parsed, matched, added, retained
             FROM scan_log
             ORDER BY scanned_at DESC, id DESC
             LIMIT ?1;",
        )?;
        let rows = stmt.query_map(params![i64::from(limit)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (millis, parsed, matched, added, retained) = row?;
            let scanned_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                StoreError::InvalidData(format!("scan_log timestamp out of range: {millis}"))
            })?;
            history.push(ScanRecord {
                scanned_at,
                parsed: count_from_db(parsed)?,
                matched: count_from_db(matched)?,
                added: count_from_db(added)?,
                retained: count_from_db(retained)?,
            });
        }
        Ok(history)
    }
}

fn count_to_db(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn count_from_db(value: i64) -> StoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative counter in scan_log: {value}")))
}

#[cfg(test)]
mod tests {
    use super::{count_from_db, RosterStore, SqliteRosterStore, StoreError};
    use crate::db::open_db_in_memory;

    #[test]
    fn empty_store_loads_empty_roster() {
        let conn = open_db_in_memory().expect("open in-memory db");
        let store = SqliteRosterStore::new(&conn);
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let conn = open_db_in_memory().expect("open in-memory db");
        conn.execute(
            "INSERT INTO roster_snapshot (id, payload, saved_at) VALUES (1, '{oops', 0);",
            [],
        )
        .expect("seed corrupt row");
        let store = SqliteRosterStore::new(&conn);
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn negative_counter_is_invalid() {
        assert!(matches!(
            count_from_db(-1),
            Err(StoreError::InvalidData(_))
        ));
        assert_eq!(count_from_db(3).expect("valid"), 3);
    }
}
