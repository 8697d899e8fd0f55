//! SQLite visit store.
//!
//! Keeps the historical `visits` table layout so existing readers continue to
//! work. Column names are misleading and kept as-is: `LastVisitTimestamp`
//! holds the FIRST sighting of the day, `NewVisitTimestamp` the most recent
//! later sighting. A `VisitDate` column (`YYYY-MM-DD`) carries the calendar
//! day for structured same-day lookups; databases created without it are
//! migrated on open. Rows a legacy writer adds later carry no `VisitDate`;
//! they are back-filled on every open and matched by their text prefix
//! until then.

use crate::timestamp::{format_day, format_visit, parse_visit};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CREATE_VISITS: &str = "
    CREATE TABLE IF NOT EXISTS visits (
        ID INTEGER PRIMARY KEY AUTOINCREMENT,
        Name TEXT,
        LastVisitTimestamp TEXT,
        NewVisitTimestamp TEXT
    )";

// DD/MM/YYYY prefix → YYYY-MM-DD
const BACKFILL_VISIT_DATE: &str = "
    UPDATE visits
    SET VisitDate = substr(LastVisitTimestamp, 7, 4) || '-'
                 || substr(LastVisitTimestamp, 4, 2) || '-'
                 || substr(LastVisitTimestamp, 1, 2)
    WHERE VisitDate IS NULL AND LastVisitTimestamp IS NOT NULL";

const SELECT_COLUMNS: &str = "ID, Name, LastVisitTimestamp, NewVisitTimestamp";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("visit {id} has unparseable timestamp {value:?}")]
    BadTimestamp { id: i64, value: String },
}

/// One person's first/last sighting on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    pub id: i64,
    pub name: String,
    /// Earliest accepted sighting of the day. Never changes after insert.
    pub first_seen: NaiveDateTime,
    /// Latest later sighting of the day, strictly after `first_seen`.
    pub last_seen: Option<NaiveDateTime>,
}

impl VisitRecord {
    /// The timestamp a new sighting must exceed to advance `last_seen`.
    pub fn latest(&self) -> NaiveDateTime {
        self.last_seen.unwrap_or(self.first_seen)
    }
}

/// Durable storage for visit records.
pub trait VisitStore {
    /// The record for `name` whose first sighting falls on `day`, if any.
    fn find_for_day(&self, name: &str, day: NaiveDate) -> Result<Option<VisitRecord>, StoreError>;

    /// Create a record with only a first sighting. Returns the new ID.
    fn insert_first_seen(&self, name: &str, first_seen: NaiveDateTime) -> Result<i64, StoreError>;

    /// Overwrite the latest sighting of an existing record.
    fn set_last_seen(&self, id: i64, last_seen: NaiveDateTime) -> Result<(), StoreError>;
}

/// `VisitStore` over a single exclusively-owned SQLite connection.
pub struct SqliteVisitStore {
    conn: Connection,
}

impl SqliteVisitStore {
    /// Open (creating if needed) the database file and ensure the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened visit store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_VISITS)?;

        if !self.has_column("visits", "VisitDate")? {
            self.conn
                .execute_batch("ALTER TABLE visits ADD COLUMN VisitDate TEXT")?;
        }
        let backfilled = self.conn.execute(BACKFILL_VISIT_DATE, [])?;
        if backfilled > 0 {
            tracing::info!(rows = backfilled, "back-filled VisitDate on legacy visits");
        }

        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_visits_name_date ON visits (Name, VisitDate)",
        )?;
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All records whose first sighting falls on `day`, ordered by ID.
    pub fn visits_on(&self, day: NaiveDate) -> Result<Vec<VisitRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM visits
             WHERE VisitDate = ?1 OR (VisitDate IS NULL AND LastVisitTimestamp LIKE ?2)
             ORDER BY ID"
        ))?;
        let rows = stmt.query_map(params![iso_day(day), legacy_prefix(day)], RawVisit::from_row)?;
        rows.map(|r| r?.into_record()).collect()
    }

    /// All records for one person, oldest first.
    pub fn visits_for(&self, name: &str) -> Result<Vec<VisitRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM visits WHERE Name = ?1 ORDER BY ID"
        ))?;
        let rows = stmt.query_map(params![name], RawVisit::from_row)?;
        rows.map(|r| r?.into_record()).collect()
    }
}

impl VisitStore for SqliteVisitStore {
    fn find_for_day(&self, name: &str, day: NaiveDate) -> Result<Option<VisitRecord>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM visits
                     WHERE Name = ?1
                       AND (VisitDate = ?2 OR (VisitDate IS NULL AND LastVisitTimestamp LIKE ?3))
                     ORDER BY ID LIMIT 1"
                ),
                params![name, iso_day(day), legacy_prefix(day)],
                RawVisit::from_row,
            )
            .optional()?;
        raw.map(RawVisit::into_record).transpose()
    }

    fn insert_first_seen(&self, name: &str, first_seen: NaiveDateTime) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO visits (Name, LastVisitTimestamp, NewVisitTimestamp, VisitDate)
             VALUES (?1, ?2, NULL, ?3)",
            params![name, format_visit(first_seen), iso_day(first_seen.date())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn set_last_seen(&self, id: i64, last_seen: NaiveDateTime) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE visits SET NewVisitTimestamp = ?1 WHERE ID = ?2",
            params![format_visit(last_seen), id],
        )?;
        Ok(())
    }
}

fn iso_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn legacy_prefix(day: NaiveDate) -> String {
    format!("{} %", format_day(day))
}

/// Row as stored, before timestamp parsing.
struct RawVisit {
    id: i64,
    name: String,
    first_seen: String,
    last_seen: Option<String>,
}

impl RawVisit {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            first_seen: row.get(2)?,
            last_seen: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<VisitRecord, StoreError> {
        let id = self.id;
        let parse = |value: String| {
            parse_visit(&value).map_err(|_| StoreError::BadTimestamp { id, value })
        };
        Ok(VisitRecord {
            id,
            name: self.name,
            first_seen: parse(self.first_seen)?,
            last_seen: self.last_seen.map(parse).transpose()?,
        })
    }
}
